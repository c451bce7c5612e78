// libs/notification-cell/src/services/resend.rs
use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{Channel, DeliveryReceipt, NotificationError};

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

/// Resend transactional email client. POST /emails
pub struct ResendEmailClient {
    client: Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl fmt::Debug for ResendEmailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendEmailClient")
            .field("api_key", &"<redacted>")
            .field("from", &self.from)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ResendEmailClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured(Channel::Email));
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.resend_api_key.clone(),
            from: format!("{} <{}>", config.practice_name, config.email_from),
            base_url: config.resend_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, NotificationError> {
        let to = to.trim();
        if to.is_empty() || !to.contains('@') {
            return Err(NotificationError::InvalidRecipient(to.to_string()));
        }

        let url = format!("{}/emails", self.base_url);
        debug!("Sending email '{}' to {}", subject, to);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&ResendEmailRequest {
                from: &self.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Resend send failed: {} - {}", status, response_text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: response_text,
            });
        }

        let email: ResendEmailResponse = serde_json::from_str(&response_text)
            .map_err(|e| NotificationError::Decode(format!("Failed to parse Resend response: {}", e)))?;

        info!("Email accepted by Resend: {}", email.id);
        Ok(DeliveryReceipt { id: email.id })
    }
}
