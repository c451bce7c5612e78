use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use contact_cell::*;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(mock_server: &MockServer) -> SupabaseContactStore {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    SupabaseContactStore::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn test_get_by_uuid_uses_uuid_column() {
    let mock_server = MockServer::start().await;
    let token = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/contacts"))
        .and(query_param("uuid", format!("eq.{}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::contact_response("12", &token.to_string(), "client@example.com")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let contact = store_for(&mock_server).get(&ContactIdentifier::ByUuid(token)).await.unwrap();
    assert_eq!(contact.id, ContactId::new("12"));
    assert_eq!(contact.uuid, token);
}

#[tokio::test]
async fn test_get_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/contacts"))
        .and(query_param("id", "eq.404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .get(&ContactIdentifier::ById(ContactId::new("404")))
        .await;
    assert_eq!(result.unwrap_err(), StoreError::NotFound);
}

#[tokio::test]
async fn test_update_sends_only_changed_columns() {
    let mock_server = MockServer::start().await;
    let token = Uuid::new_v4().to_string();

    let mut row = MockSupabaseResponses::contact_response("3", &token, "client@example.com");
    row["appointment_status"] = json!("CANCELLED");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/contacts"))
        .and(query_param("id", "eq.3"))
        .and(body_partial_json(json!({
            "appointment_status": "CANCELLED",
            "scheduled_appointment_at": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let update = ContactUpdate {
        appointment_status: Some(Some(AppointmentStatus::Cancelled)),
        scheduled_appointment_at: Some(None),
        ..Default::default()
    };
    let contact = store_for(&mock_server)
        .update(&ContactIdentifier::ById(ContactId::new("3")), update)
        .await
        .unwrap();
    assert_eq!(contact.appointment_status, Some(AppointmentStatus::Cancelled));
}

#[tokio::test]
async fn test_update_matching_nothing_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let update = ContactUpdate {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let result = store_for(&mock_server)
        .update(&ContactIdentifier::ById(ContactId::new("77")), update)
        .await;
    assert_eq!(result.unwrap_err(), StoreError::NotFound);
}

#[tokio::test]
async fn test_duplicate_email_insert_is_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/contacts"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505"),
        ))
        .mount(&mock_server)
        .await;

    let new_contact = NewContact {
        uuid: Uuid::new_v4(),
        name: "Dup".to_string(),
        email: "dup@example.com".to_string(),
        phone: None,
        contact_status: ContactStatus::New,
        custom_fields: CustomFields::default(),
        notes: None,
    };
    assert_matches!(store_for(&mock_server).insert(new_contact).await, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_server_error_is_storage_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/contacts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).find_by_email("x@example.com").await;
    assert_matches!(result, Err(StoreError::Storage(_)));
}

#[tokio::test]
async fn test_find_by_email_ignores_stored_case() {
    let mock_server = MockServer::start().await;
    let token = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/contacts"))
        .and(query_param("email", "ilike.client@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::contact_response("8", &token, "Client@Example.COM")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let contact = store_for(&mock_server)
        .find_by_email("  CLIENT@example.com ")
        .await
        .unwrap()
        .expect("mixed-case row should match");
    assert_eq!(contact.id, ContactId::new("8"));
}

#[tokio::test]
async fn test_find_by_email_skips_wildcard_lookalikes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/contacts"))
        .and(query_param("email", "ilike.first\\_last@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::contact_response("9", &Uuid::new_v4().to_string(), "firstxlast@example.com")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let found = store_for(&mock_server).find_by_email("first_last@example.com").await.unwrap();
    assert!(found.is_none());
}
