// libs/conversation-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use contact_cell::{ContactError, ContactId, QuestionId, StoreError};

use crate::script::Outcome;

/// Where the contact is in the script: the next question, or `"complete"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextQuestion {
    Ask(QuestionId),
    Complete,
}

impl Serialize for NextQuestion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NextQuestion::Ask(question) => serializer.serialize_str(question.as_str()),
            NextQuestion::Complete => serializer.serialize_str("complete"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredItem {
    pub question_id: QuestionId,
    pub question: String,
    pub response: String,
    pub response_value: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub answered: Vec<AnsweredItem>,
    pub next: NextQuestion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// An answer as submitted by a caller; `question_id` is still unvalidated.
#[derive(Debug, Clone, Default)]
pub struct ResponseInput {
    pub question_id: String,
    pub question: Option<String>,
    pub response: String,
    pub response_value: Option<String>,
}

/// Body of `POST /conversation`. Without `questionId`/`response` it only
/// reads the current state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub contact_id: Option<String>,
    pub uuid: Option<String>,
    pub question_id: Option<String>,
    pub question: Option<String>,
    pub response: Option<String>,
    pub response_value: Option<String>,
}

impl ConversationRequest {
    pub fn answer(&self) -> Result<Option<ResponseInput>, ConversationError> {
        match (&self.question_id, &self.response) {
            (Some(question_id), Some(response)) => Ok(Some(ResponseInput {
                question_id: question_id.clone(),
                question: self.question.clone(),
                response: response.clone(),
                response_value: self.response_value.clone(),
            })),
            (None, None) => Ok(None),
            _ => Err(ConversationError::InvalidInput(
                "questionId and response must be provided together".to_string(),
            )),
        }
    }
}

/// Fields Twilio posts for an inbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsReply {
    pub contact_id: Option<ContactId>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum ConversationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Contact not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ContactError> for ConversationError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::InvalidInput(msg) => ConversationError::InvalidInput(msg),
            ContactError::NotFound => ConversationError::NotFound,
            ContactError::Conflict(msg) => ConversationError::Conflict(msg),
            ContactError::Storage(msg) => ConversationError::Storage(msg),
        }
    }
}

impl From<StoreError> for ConversationError {
    fn from(e: StoreError) -> Self {
        ContactError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_question_serialization() {
        assert_eq!(json!(NextQuestion::Ask(QuestionId::MainFocus)), json!("main_focus"));
        assert_eq!(json!(NextQuestion::Complete), json!("complete"));
    }

    #[test]
    fn test_partial_answer_is_rejected() {
        let request = ConversationRequest {
            contact_id: Some("c1".to_string()),
            question_id: Some("main_focus".to_string()),
            ..Default::default()
        };
        assert!(request.answer().is_err());
    }
}
