use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use contact_cell::store::memory::contact_fixture;
use contact_cell::InMemoryContactStore;
use conversation_cell::router::conversation_routes;
use conversation_cell::*;

fn create_test_app() -> Router {
    let store = Arc::new(InMemoryContactStore::with_contacts(vec![contact_fixture("c1", "a@example.com")]));
    conversation_routes(Arc::new(ConversationEngine::new(store, QuestionScript::standard())))
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn test_state_request_for_fresh_contact() {
    let response = create_test_app().oneshot(post_json(json!({"contactId": "c1"}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["conversationState"]["answered"], json!([]));
    assert_eq!(body["conversationState"]["next"], "georgia_location");
    assert_eq!(body["conversationState"]["complete"], false);
}

#[tokio::test]
async fn test_record_response_returns_next_prompt() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(json!({
            "contactId": "c1",
            "questionId": "georgia_location",
            "response": "Yes",
            "responseValue": "yes"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let state = &body["conversationState"];
    assert_eq!(state["next"], "fit_or_free_offer");
    assert_eq!(state["answered"][0]["questionId"], "georgia_location");
    assert_eq!(state["answered"][0]["responseValue"], "yes");
}

#[tokio::test]
async fn test_errors_use_failure_envelope() {
    let app = create_test_app();

    let unknown_question = app
        .clone()
        .oneshot(post_json(json!({"contactId": "c1", "questionId": "zodiac", "response": "leo"})))
        .await
        .unwrap();
    assert_eq!(unknown_question.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(unknown_question).await).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let unknown_contact = app.oneshot(post_json(json!({"contactId": "nobody"}))).await.unwrap();
    assert_eq!(unknown_contact.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inbound_sms_returns_twiml() {
    let request = Request::builder()
        .method("POST")
        .uri("/sms")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("From=%2B14045550101&Body=yes&To=%2B14045550000"))
        .unwrap();

    let response = create_test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("free 15-minute consultation"));
}
