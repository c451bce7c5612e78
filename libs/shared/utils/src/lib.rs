pub mod extractor;
pub mod jwt;
pub mod phone;
pub mod retry;
pub mod test_utils;

pub use phone::{format_phone, to_e164, PhoneError};
pub use retry::{retry_with_backoff, RetryPolicy, Retryable};
