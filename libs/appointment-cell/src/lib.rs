pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::AppointmentState;
pub use models::*;
pub use services::booking::AppointmentBookingService;
pub use services::lifecycle::AppointmentLifecycleService;

use shared_models::error::AppError;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::InvalidInput(msg) => AppError::BadRequest(msg),
            AppointmentError::NotFound => AppError::NotFound("Contact not found".to_string()),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}
