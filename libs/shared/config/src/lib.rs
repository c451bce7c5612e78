use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub cron_secret: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub twilio_base_url: String,
    pub resend_api_key: String,
    pub resend_base_url: String,
    pub email_from: String,
    pub site_url: String,
    pub practice_name: String,
    pub default_time_zone: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub reminder_windows_hours: Vec<i64>,
    pub no_show_grace_minutes: i64,
    pub questionnaire_stale_hours: i64,
    pub sweep_batch_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .or_else(|_| env::var("SUPABASE_ANON_PUBLIC_KEY"))
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET"),
            cron_secret: required("CRON_SECRET"),
            twilio_account_sid: required("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: required("TWILIO_AUTH_TOKEN"),
            twilio_from_number: required("TWILIO_FROM_NUMBER"),
            twilio_base_url: with_default("TWILIO_BASE_URL", "https://api.twilio.com"),
            resend_api_key: required("RESEND_API_KEY"),
            resend_base_url: with_default("RESEND_BASE_URL", "https://api.resend.com"),
            email_from: with_default("EMAIL_FROM", "hello@example.com"),
            site_url: with_default("SITE_URL", "http://localhost:3000"),
            practice_name: with_default("PRACTICE_NAME", "Therapy Practice"),
            default_time_zone: with_default("DEFAULT_TIME_ZONE", "America/New_York"),
            port: parsed("PORT", 3000),
            store_backend: match env::var("STORE_BACKEND").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::Supabase,
            },
            reminder_windows_hours: env::var("REMINDER_WINDOWS_HOURS")
                .ok()
                .map(|raw| parse_hours_list(&raw))
                .filter(|hours| !hours.is_empty())
                .unwrap_or_else(|| vec![24, 2]),
            no_show_grace_minutes: parsed("NO_SHOW_GRACE_MINUTES", 30),
            questionnaire_stale_hours: parsed("QUESTIONNAIRE_STALE_HOURS", 24),
            sweep_batch_limit: parsed("SWEEP_BATCH_LIMIT", 100),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
            && !self.cron_secret.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.resend_api_key.is_empty() && !self.email_from.is_empty()
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Parses "24,2" into `[24, 2]`, dropping anything that is not a positive integer.
pub fn parse_hours_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .filter(|hours| *hours > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours_list() {
        assert_eq!(parse_hours_list("24,2"), vec![24, 2]);
        assert_eq!(parse_hours_list(" 48 , x, -1, 6"), vec![48, 6]);
        assert!(parse_hours_list("").is_empty());
    }
}
