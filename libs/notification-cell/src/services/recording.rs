// libs/notification-cell/src/services/recording.rs
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{Channel, DeliveryReceipt, NotificationError, SentNotification};
use crate::services::sender::NotificationSender;

/// Captures messages instead of delivering them. Used by tests and by
/// `STORE_BACKEND=memory` development runs.
#[derive(Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<SentNotification>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send fails with a provider error until switched back.
    pub fn fail_sends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_on(&self, channel: Channel) -> Vec<SentNotification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.channel() == channel)
            .cloned()
            .collect()
    }

    /// Sends attempted, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn record(&self, notification: SentNotification) -> Result<DeliveryReceipt, NotificationError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Provider {
                status: 503,
                message: "simulated provider outage".to_string(),
            });
        }

        self.sent.lock().await.push(notification);
        Ok(DeliveryReceipt { id: format!("rec-{}", n) })
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, NotificationError> {
        self.record(SentNotification::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        })
        .await
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotificationError> {
        self.record(SentNotification::Sms {
            to: to.to_string(),
            body: body.to_string(),
        })
        .await
    }
}
