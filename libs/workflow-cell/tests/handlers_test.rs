use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use contact_cell::store::memory::contact_fixture;
use contact_cell::{AppointmentStatus, InMemoryContactStore};
use conversation_cell::{ConversationEngine, QuestionScript};
use notification_cell::RecordingNotificationSender;
use shared_utils::test_utils::TestConfig;
use workflow_cell::router::workflow_routes;
use workflow_cell::*;

fn create_test_app() -> (Router, Arc<RecordingNotificationSender>) {
    let mut contact = contact_fixture("c1", "c1@example.com");
    contact.appointment_status = Some(AppointmentStatus::Scheduled);
    contact.scheduled_appointment_at = Some(Utc::now() + Duration::hours(20));

    let config = TestConfig::default().to_app_config();
    let store = Arc::new(InMemoryContactStore::with_contacts(vec![contact]));
    let sender = Arc::new(RecordingNotificationSender::new());
    let engine = Arc::new(ConversationEngine::new(store.clone(), QuestionScript::standard()));
    let sweep = WorkflowSweepService::new(
        store,
        sender.clone(),
        engine,
        WorkflowConfig::from_app_config(&config),
    );

    let state = WorkflowState {
        sweep: Arc::new(sweep),
        cron_secret: config.cron_secret.clone(),
    };
    (workflow_routes(state), sender)
}

fn sweep_request(auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/sweep");
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_sweep_with_cron_secret() {
    let (app, sender) = create_test_app();

    let response = app
        .oneshot(sweep_request(Some("Bearer test-cron-secret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["totalProcessed"], 1);
    assert_eq!(body["breakdown"]["appointment_reminder"], 1);
    assert_eq!(body["breakdown"]["missed_appointment"], 0);
    assert_eq!(body["errors"], serde_json::json!([]));
    assert!(body["processingTimeMs"].is_u64());
    assert_eq!(sender.sent().await.len(), 1);
}

#[tokio::test]
async fn test_sweep_without_header_is_unauthorized() {
    let (app, sender) = create_test_app();

    let response = app.oneshot(sweep_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(sender.sent().await.is_empty());
}

#[tokio::test]
async fn test_sweep_with_wrong_secret_is_unauthorized() {
    let (app, _) = create_test_app();

    let response = app.oneshot(sweep_request(Some("Bearer nope"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sweep_with_malformed_header_is_unauthorized() {
    let (app, _) = create_test_app();

    let response = app.oneshot(sweep_request(Some("Basic dGVzdA=="))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
