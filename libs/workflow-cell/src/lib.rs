pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::WorkflowState;
pub use models::*;
pub use services::sweep::WorkflowSweepService;

use shared_models::error::AppError;

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Unauthorized(msg) => AppError::Auth(msg),
        }
    }
}
