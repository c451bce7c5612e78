// libs/notification-cell/src/models.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_utils::Retryable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => f.write_str("email"),
            Channel::Sms => f.write_str("sms"),
        }
    }
}

/// Provider message id of an accepted send (Resend email id or Twilio SID).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("{0} delivery is not configured")]
    NotConfigured(Channel),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Provider rejected the message ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),
}

impl Retryable for NotificationError {
    fn is_transient(&self) -> bool {
        match self {
            NotificationError::Transport(_) => true,
            NotificationError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A message captured by the recording sender.
#[derive(Debug, Clone, PartialEq)]
pub enum SentNotification {
    Email { to: String, subject: String, html: String },
    Sms { to: String, body: String },
}

impl SentNotification {
    pub fn channel(&self) -> Channel {
        match self {
            SentNotification::Email { .. } => Channel::Email,
            SentNotification::Sms { .. } => Channel::Sms,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            SentNotification::Email { to, .. } | SentNotification::Sms { to, .. } => to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(NotificationError::Transport("reset".into()).is_transient());
        assert!(NotificationError::Provider { status: 503, message: String::new() }.is_transient());
        assert!(NotificationError::Provider { status: 429, message: String::new() }.is_transient());
        assert!(!NotificationError::Provider { status: 400, message: String::new() }.is_transient());
        assert!(!NotificationError::InvalidRecipient("x".into()).is_transient());
    }
}
