use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub service_role_key: String,
    pub cron_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            service_role_key: "test-service-role-key".to_string(),
            cron_secret: "test-cron-secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_role_key: self.service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            cron_secret: self.cron_secret.clone(),
            twilio_account_sid: "AC-test".to_string(),
            twilio_auth_token: "twilio-token".to_string(),
            twilio_from_number: "+14045550000".to_string(),
            twilio_base_url: "http://localhost:4010".to_string(),
            resend_api_key: "re_test".to_string(),
            resend_base_url: "http://localhost:4020".to_string(),
            email_from: "care@example.com".to_string(),
            site_url: "https://practice.example.com".to_string(),
            practice_name: "Test Therapy".to_string(),
            default_time_zone: "America/New_York".to_string(),
            port: 3000,
            store_backend: StoreBackend::Memory,
            reminder_windows_hours: vec![24, 2],
            no_show_grace_minutes: 30,
            questionnaire_stale_hours: 24,
            sweep_batch_limit: 100,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::staff("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "authenticated")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Row shapes as PostgREST returns them from the `contacts` table.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn contact_response(id: &str, uuid: &str, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "uuid": uuid,
            "name": "Test Client",
            "email": email,
            "phone": "404-555-1234",
            "contact_status": "new",
            "scheduled_appointment_at": null,
            "appointment_status": null,
            "appointment_time_zone": null,
            "appointment_notes": null,
            "last_appointment_update": null,
            "last_auto_reminder_sent": null,
            "auto_reminder_count": 0,
            "custom_fields": {},
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn scheduled_contact_response(id: &str, uuid: &str, scheduled_at: &str) -> serde_json::Value {
        let mut contact = Self::contact_response(id, uuid, "client@example.com");
        contact["contact_status"] = json!("scheduled");
        contact["scheduled_appointment_at"] = json!(scheduled_at);
        contact["appointment_status"] = json!("SCHEDULED");
        contact["appointment_time_zone"] = json!("America/New_York");
        contact
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
