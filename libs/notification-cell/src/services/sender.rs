// libs/notification-cell/src/services/sender.rs
use async_trait::async_trait;
use tracing::warn;

use shared_config::AppConfig;
use shared_utils::{retry_with_backoff, RetryPolicy};

use crate::models::{Channel, DeliveryReceipt, NotificationError};
use crate::services::resend::ResendEmailClient;
use crate::services::twilio::TwilioSmsClient;

/// Outbound email/SMS. Callers own retry decisions for anything beyond the
/// provider-level backoff done here.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, NotificationError>;

    async fn send_sms(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotificationError>;
}

/// Production sender: Twilio for SMS, Resend for email, each call wrapped in
/// exponential backoff.
pub struct HttpNotificationSender {
    sms: Option<TwilioSmsClient>,
    email: Option<ResendEmailClient>,
    retry: RetryPolicy,
}

impl HttpNotificationSender {
    pub fn from_config(config: &AppConfig) -> Self {
        let sms = TwilioSmsClient::new(config)
            .inspect_err(|e| warn!("SMS notifications disabled: {}", e))
            .ok();
        let email = ResendEmailClient::new(config)
            .inspect_err(|e| warn!("Email notifications disabled: {}", e))
            .ok();

        Self {
            sms,
            email,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, NotificationError> {
        let client = self
            .email
            .as_ref()
            .ok_or(NotificationError::NotConfigured(Channel::Email))?;

        retry_with_backoff(&self.retry, "email send", || client.send(to, subject, html)).await
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotificationError> {
        let client = self
            .sms
            .as_ref()
            .ok_or(NotificationError::NotConfigured(Channel::Sms))?;

        retry_with_backoff(&self.retry, "sms send", || client.send(to, body)).await
    }
}
