use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};

use appointment_cell::*;
use contact_cell::store::memory::contact_fixture;
use contact_cell::{Contact, ContactIdentifier, ContactStatus, InMemoryContactStore};

fn service_with(contacts: Vec<Contact>) -> (Arc<InMemoryContactStore>, AppointmentLifecycleService) {
    let store = Arc::new(InMemoryContactStore::with_contacts(contacts));
    (store.clone(), AppointmentLifecycleService::new(store, "America/New_York"))
}

fn scheduled_contact(id: &str, email: &str, at: chrono::DateTime<Utc>) -> Contact {
    let mut contact = contact_fixture(id, email);
    contact.scheduled_appointment_at = Some(at);
    contact.appointment_status = Some(AppointmentStatus::Scheduled);
    contact.contact_status = ContactStatus::Scheduled;
    contact
}

fn id(raw: &str) -> ContactIdentifier {
    ContactIdentifier::parse(raw).unwrap()
}

#[tokio::test]
async fn test_schedule_opens_fresh_window() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut contact = contact_fixture("1", "a@example.com");
    contact.appointment_status = Some(AppointmentStatus::Cancelled);
    contact.appointment_notes = Some("Appointment cancelled by user".to_string());
    contact.last_auto_reminder_sent = Some(now - Duration::days(3));
    let (_, service) = service_with(vec![contact]);

    let when = now + Duration::days(2);
    let updated = service.schedule(&id("1"), when, Some("America/Chicago"), now).await.unwrap();

    assert_eq!(updated.appointment_status, Some(AppointmentStatus::Scheduled));
    assert_eq!(updated.scheduled_appointment_at, Some(when));
    assert_eq!(updated.appointment_time_zone.as_deref(), Some("America/Chicago"));
    assert_eq!(updated.appointment_notes, None);
    assert_eq!(updated.last_appointment_update, Some(now));
    assert_eq!(updated.last_auto_reminder_sent, None);
    assert_eq!(updated.contact_status, ContactStatus::Scheduled);
}

#[tokio::test]
async fn test_schedule_unknown_contact() {
    let (_, service) = service_with(vec![]);
    let now = Utc::now();
    let result = service.schedule(&id("404"), now + Duration::hours(1), None, now).await;
    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_cancel_twice_is_idempotent() {
    let now = Utc::now();
    let contact = scheduled_contact("7", "b@example.com", now + Duration::days(1));
    let token = contact.uuid;
    let (store, service) = service_with(vec![contact]);

    let first = service.cancel(&id(&token.to_string()), None, now).await.unwrap();
    assert_eq!(first.appointment_status, Some(AppointmentStatus::Cancelled));
    assert_eq!(first.scheduled_appointment_at, None);
    assert_eq!(first.appointment_notes.as_deref(), Some("Appointment cancelled by user"));
    assert_eq!(first.last_appointment_update, Some(now));

    let later = now + Duration::minutes(5);
    let second = service.cancel(&id("7"), Some("changed my mind"), later).await.unwrap();
    assert_eq!(second.appointment_status, Some(AppointmentStatus::Cancelled));
    assert_eq!(second.scheduled_appointment_at, None);
    assert_eq!(second.appointment_notes, first.appointment_notes);
    assert_eq!(second.last_appointment_update, Some(now));
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_cancel_uses_operator_reason() {
    let now = Utc::now();
    let (_, service) = service_with(vec![scheduled_contact("7", "b@example.com", now + Duration::days(1))]);

    let cancelled = service.cancel(&id("7"), Some("Therapist unavailable"), now).await.unwrap();
    assert_eq!(cancelled.appointment_notes.as_deref(), Some("Therapist unavailable"));
}

#[tokio::test]
async fn test_set_status_is_case_insensitive_and_stored_upper_case() {
    let now = Utc::now();
    let (_, service) = service_with(vec![scheduled_contact("3", "c@example.com", now - Duration::hours(2))]);

    let updated = service.set_status(&id("3"), "no-show", None, now).await.unwrap();
    assert_eq!(updated.appointment_status, Some(AppointmentStatus::NoShow));
    assert_eq!(serde_json::to_value(updated.appointment_status).unwrap(), "NO_SHOW");
}

#[tokio::test]
async fn test_set_status_rejects_unknown_value_without_writing() {
    let now = Utc::now();
    let (store, service) = service_with(vec![scheduled_contact("3", "c@example.com", now)]);

    let err = service.set_status(&id("3"), "done", None, now).await.unwrap_err();
    assert_matches!(&err, AppointmentError::InvalidInput(msg) if msg.contains("PENDING, SCHEDULED, COMPLETED, CANCELLED, NO_SHOW"));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_completed_appends_admin_note_and_converts() {
    let now = Utc::now();
    let mut contact = scheduled_contact("3", "c@example.com", now - Duration::hours(1));
    contact.appointment_notes = Some("Prefers video".to_string());
    let (_, service) = service_with(vec![contact]);

    let updated = service.set_status(&id("3"), "COMPLETED", None, now).await.unwrap();
    assert_eq!(
        updated.appointment_notes.as_deref(),
        Some("Prefers video\nAppointment completed - marked by admin")
    );
    assert_eq!(updated.contact_status, ContactStatus::Converted);
}

#[tokio::test]
async fn test_completed_keeps_caller_notes() {
    let now = Utc::now();
    let (_, service) = service_with(vec![scheduled_contact("3", "c@example.com", now - Duration::hours(1))]);

    let updated = service
        .set_status(&id("3"), "completed", Some("Great first session"), now)
        .await
        .unwrap();
    assert_eq!(updated.appointment_notes.as_deref(), Some("Great first session"));
}

#[tokio::test]
async fn test_cancelled_status_clears_timestamp() {
    let now = Utc::now();
    let (_, service) = service_with(vec![scheduled_contact("3", "c@example.com", now + Duration::days(1))]);

    let updated = service.set_status(&id("3"), "cancelled", None, now).await.unwrap();
    assert_eq!(updated.scheduled_appointment_at, None);
}

#[tokio::test]
async fn test_storage_failure_surfaces_and_changes_nothing() {
    let now = Utc::now();
    let (store, service) = service_with(vec![scheduled_contact("3", "c@example.com", now + Duration::days(1))]);
    store.fail_writes(true);

    assert_matches!(service.cancel(&id("3"), None, now).await, Err(AppointmentError::Storage(_)));
    let stored = store.snapshot(&id("3")).await.unwrap();
    assert_eq!(stored.appointment_status, Some(AppointmentStatus::Scheduled));
}

#[tokio::test]
async fn test_list_upcoming_ascending() {
    let now = Utc::now();
    let (_, service) = service_with(vec![
        scheduled_contact("1", "a@example.com", now + Duration::days(3)),
        scheduled_contact("2", "b@example.com", now - Duration::days(1)),
        scheduled_contact("3", "c@example.com", now + Duration::hours(4)),
        contact_fixture("4", "d@example.com"),
    ]);

    let filter = ListFilter {
        upcoming_only: true,
        ..Default::default()
    };
    let appointments = service.list_appointments(&filter, now).await.unwrap();
    let ids: Vec<&str> = appointments.iter().map(|a| a.contact_id.as_str()).collect();
    assert_eq!(ids, vec!["3", "1"]);
}

#[tokio::test]
async fn test_list_by_status() {
    let now = Utc::now();
    let mut cancelled = contact_fixture("5", "e@example.com");
    cancelled.appointment_status = Some(AppointmentStatus::Cancelled);
    let (_, service) = service_with(vec![
        scheduled_contact("1", "a@example.com", now + Duration::days(3)),
        cancelled,
    ]);

    let filter = ListFilter {
        status: Some(AppointmentStatus::Cancelled),
        ..Default::default()
    };
    let appointments = service.list_appointments(&filter, now).await.unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].contact_id.as_str(), "5");
}

#[tokio::test]
async fn test_cancel_leaves_finished_appointments_alone() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let (store, service) = service_with(vec![
        contact_fixture("20", "done@example.com"),
        scheduled_contact("21", "missed@example.com", now - Duration::hours(3)),
    ]);

    service.schedule(&id("20"), now + Duration::hours(1), None, now).await.unwrap();
    let completed = service
        .set_status(&id("20"), "completed", None, now + Duration::hours(2))
        .await
        .unwrap();
    service.set_status(&id("21"), "no-show", None, now).await.unwrap();
    let writes = store.write_count();

    let after = service.cancel(&id("20"), None, now + Duration::hours(3)).await.unwrap();
    assert_eq!(after.appointment_status, Some(AppointmentStatus::Completed));
    assert_eq!(after.appointment_notes, completed.appointment_notes);
    assert_eq!(after.scheduled_appointment_at, completed.scheduled_appointment_at);

    let no_show = service.cancel(&id("21"), Some("sorry"), now + Duration::hours(3)).await.unwrap();
    assert_eq!(no_show.appointment_status, Some(AppointmentStatus::NoShow));
    assert_eq!(store.write_count(), writes);
}
