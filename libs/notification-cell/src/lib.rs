pub mod models;
pub mod services;
pub mod templates;

pub use models::{Channel, DeliveryReceipt, NotificationError, SentNotification};
pub use services::recording::RecordingNotificationSender;
pub use services::resend::ResendEmailClient;
pub use services::sender::{HttpNotificationSender, NotificationSender};
pub use services::twilio::TwilioSmsClient;
