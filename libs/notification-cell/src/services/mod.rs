pub mod recording;
pub mod resend;
pub mod sender;
pub mod twilio;
