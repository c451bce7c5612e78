pub mod handlers;
pub mod models;
pub mod router;
pub mod script;
pub mod services;

pub use models::*;
pub use script::{normalize_response, NextStep, Outcome, QuestionScript};
pub use services::engine::ConversationEngine;

use shared_models::error::AppError;

impl From<ConversationError> for AppError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::InvalidInput(msg) => AppError::BadRequest(msg),
            ConversationError::NotFound => AppError::NotFound("Contact not found".to_string()),
            ConversationError::Conflict(msg) => AppError::Conflict(msg),
            ConversationError::Storage(msg) => AppError::Database(msg),
        }
    }
}
