// libs/notification-cell/src/services/twilio.rs
use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_utils::to_e164;

use crate::models::{Channel, DeliveryReceipt, NotificationError};

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

/// Twilio Programmable Messaging client.
/// POST /2010-04-01/Accounts/{AccountSid}/Messages.json
pub struct TwilioSmsClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl fmt::Debug for TwilioSmsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioSmsClient")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwilioSmsClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_sms_configured() {
            return Err(NotificationError::NotConfigured(Channel::Sms));
        }

        Ok(Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotificationError> {
        let to = to_e164(to).map_err(|e| NotificationError::InvalidRecipient(format!("{}: {}", to, e)))?;
        let url = format!("{}/2010-04-01/Accounts/{}/Messages.json", self.base_url, self.account_sid);

        debug!("Sending SMS to {} via {}", to, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Twilio send failed: {} - {}", status, response_text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: response_text,
            });
        }

        let message: TwilioMessageResponse = serde_json::from_str(&response_text)
            .map_err(|e| NotificationError::Decode(format!("Failed to parse Twilio response: {}", e)))?;

        info!("SMS accepted by Twilio: {}", message.sid);
        Ok(DeliveryReceipt { id: message.sid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::TestConfig;

    #[test]
    fn test_client_creation_fails_without_config() {
        let mut config = TestConfig::default().to_app_config();
        config.twilio_auth_token = String::new();

        assert_matches!(
            TwilioSmsClient::new(&config),
            Err(NotificationError::NotConfigured(Channel::Sms))
        );
    }

    #[test]
    fn test_debug_output_hides_auth_token() {
        let client = TwilioSmsClient::new(&TestConfig::default().to_app_config()).unwrap();
        let printed = format!("{:?}", client);
        assert!(printed.contains("AC-test"));
        assert!(!printed.contains("twilio-token"));
    }

    #[tokio::test]
    async fn test_foreign_number_rejected_before_request() {
        let client = TwilioSmsClient::new(&TestConfig::default().to_app_config()).unwrap();
        let result = client.send("+44 20 7946 0958", "hi").await;
        assert_matches!(result, Err(NotificationError::InvalidRecipient(_)));
    }
}
