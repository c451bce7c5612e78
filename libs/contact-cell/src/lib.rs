pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use services::contact::ContactService;
pub use store::{ContactStore, InMemoryContactStore, StoreError, SupabaseContactStore};

use shared_models::error::AppError;

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::InvalidInput(msg) => AppError::BadRequest(msg),
            ContactError::NotFound => AppError::NotFound("Contact not found".to_string()),
            ContactError::Conflict(msg) => AppError::Conflict(msg),
            ContactError::Storage(msg) => AppError::Database(msg),
        }
    }
}
