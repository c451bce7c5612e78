use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_database::SupabaseClient;

use crate::models::{
    normalize_email, Contact, ContactIdentifier, ContactQuery, ContactUpdate, NewContact,
};
use crate::store::{ContactStore, StoreError};

const CONTACTS_PATH: &str = "/rest/v1/contacts";
const EMAIL_MATCH_LIMIT: usize = 5;

pub struct SupabaseContactStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseContactStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn identifier_filter(identifier: &ContactIdentifier) -> String {
        match identifier {
            ContactIdentifier::ById(id) => format!("id=eq.{}", urlencoding::encode(id.as_str())),
            ContactIdentifier::ByUuid(uuid) => format!("uuid=eq.{}", uuid),
        }
    }

    /// `ilike` pattern matching exactly `email`, with LIKE wildcards escaped.
    fn email_filter(email: &str) -> String {
        let mut pattern = String::with_capacity(email.len());
        for ch in email.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        format!("email=ilike.{}&limit={}", urlencoding::encode(&pattern), EMAIL_MATCH_LIMIT)
    }

    fn timestamp(at: DateTime<Utc>) -> String {
        urlencoding::encode(&at.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
    }

    /// Builds the PostgREST query string for a listing.
    pub fn query_string(query: &ContactQuery) -> String {
        let mut query_parts = vec!["select=*".to_string()];

        if let Some(status) = query.appointment_status {
            query_parts.push(format!("appointment_status=eq.{}", status));
        } else if query.with_appointment_status {
            query_parts.push("appointment_status=not.is.null".to_string());
        }
        match (query.scheduled_from, query.scheduled_to) {
            (Some(from), Some(to)) => query_parts.push(format!(
                "and=(scheduled_appointment_at.gte.{},scheduled_appointment_at.lte.{})",
                Self::timestamp(from),
                Self::timestamp(to)
            )),
            (Some(from), None) => query_parts.push(format!("scheduled_appointment_at=gte.{}", Self::timestamp(from))),
            (None, Some(to)) => query_parts.push(format!("scheduled_appointment_at=lte.{}", Self::timestamp(to))),
            (None, None) => {}
        }
        if query.has_conversation_responses {
            query_parts.push("custom_fields->conversation_responses=not.is.null".to_string());
        }

        query_parts.push("order=scheduled_appointment_at.asc.nullslast,id.asc".to_string());
        if let Some(limit) = query.limit {
            query_parts.push(format!("limit={}", limit));
        }
        if let Some(offset) = query.offset.filter(|offset| *offset > 0) {
            query_parts.push(format!("offset={}", offset));
        }

        query_parts.join("&")
    }

    async fn fetch_rows(&self, query_string: &str) -> Result<Vec<Contact>, StoreError> {
        let path = format!("{}?{}", CONTACTS_PATH, query_string);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| StoreError::Storage(format!("Failed to parse contact: {}", e)))
            })
            .collect()
    }

    async fn fetch_one(&self, query_string: &str) -> Result<Option<Contact>, StoreError> {
        let mut rows = self.fetch_rows(&format!("{}&limit=1", query_string)).await?;
        Ok(rows.pop())
    }
}

#[async_trait]
impl ContactStore for SupabaseContactStore {
    async fn get(&self, identifier: &ContactIdentifier) -> Result<Contact, StoreError> {
        debug!("Fetching contact {}", identifier);
        self.fetch_one(&Self::identifier_filter(identifier))
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Case-insensitive: rows written by other clients may keep mixed-case
    /// addresses. `ilike` narrows the rows, the exact comparison decides.
    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, StoreError> {
        let normalized = normalize_email(email);
        let rows = self.fetch_rows(&Self::email_filter(&normalized)).await?;
        Ok(rows.into_iter().find(|c| normalize_email(&c.email) == normalized))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError> {
        self.fetch_one(&format!("phone=eq.{}", urlencoding::encode(phone))).await
    }

    async fn query(&self, query: &ContactQuery) -> Result<Vec<Contact>, StoreError> {
        debug!("Querying contacts with filters: {:?}", query);
        self.fetch_rows(&Self::query_string(query)).await
    }

    async fn update(&self, identifier: &ContactIdentifier, mut update: ContactUpdate) -> Result<Contact, StoreError> {
        update.updated_at.get_or_insert_with(Utc::now);
        if let Some(email) = update.email.as_mut() {
            *email = normalize_email(email);
        }

        let body = serde_json::to_value(&update)
            .map_err(|e| StoreError::Storage(format!("Failed to encode update: {}", e)))?;
        let path = format!("{}?{}", CONTACTS_PATH, Self::identifier_filter(identifier));

        let rows: Vec<Value> = self.supabase.request(Method::PATCH, &path, None, Some(body)).await?;
        let row = rows.into_iter().next().ok_or(StoreError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| StoreError::Storage(format!("Failed to parse contact: {}", e)))
    }

    async fn insert(&self, mut contact: NewContact) -> Result<Contact, StoreError> {
        contact.email = normalize_email(&contact.email);
        let body = serde_json::to_value(&contact)
            .map_err(|e| StoreError::Storage(format!("Failed to encode contact: {}", e)))?;

        let rows: Vec<Value> = self.supabase.request(Method::POST, CONTACTS_PATH, None, Some(body)).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Storage("Insert returned no row".to_string()))?;

        let created: Contact = serde_json::from_value(row)
            .map_err(|e| StoreError::Storage(format!("Failed to parse contact: {}", e)))?;
        info!("Created contact {} ({})", created.id, created.uuid);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::AppointmentStatus;

    #[test]
    fn test_query_string_for_reminder_window() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let query = ContactQuery {
            appointment_status: Some(AppointmentStatus::Scheduled),
            scheduled_from: Some(from),
            scheduled_to: Some(to),
            limit: Some(100),
            ..Default::default()
        };

        assert_eq!(
            SupabaseContactStore::query_string(&query),
            "select=*&appointment_status=eq.SCHEDULED\
             &and=(scheduled_appointment_at.gte.2024-05-01T12%3A00%3A00Z,scheduled_appointment_at.lte.2024-05-02T12%3A00%3A00Z)\
             &order=scheduled_appointment_at.asc.nullslast,id.asc&limit=100"
        );
    }

    #[test]
    fn test_email_filter_escapes_wildcards() {
        assert_eq!(
            SupabaseContactStore::email_filter("a_b%c@example.com"),
            "email=ilike.a%5C_b%5C%25c%40example.com&limit=5"
        );
    }

    #[test]
    fn test_query_string_for_conversation_candidates() {
        let query = ContactQuery {
            has_conversation_responses: true,
            with_appointment_status: true,
            ..Default::default()
        };

        assert_eq!(
            SupabaseContactStore::query_string(&query),
            "select=*&appointment_status=not.is.null\
             &custom_fields->conversation_responses=not.is.null\
             &order=scheduled_appointment_at.asc.nullslast,id.asc"
        );
    }

    #[test]
    fn test_query_string_pages_with_offset() {
        let query = ContactQuery {
            has_conversation_responses: true,
            limit: Some(50),
            offset: Some(100),
            ..Default::default()
        };

        assert_eq!(
            SupabaseContactStore::query_string(&query),
            "select=*&custom_fields->conversation_responses=not.is.null\
             &order=scheduled_appointment_at.asc.nullslast,id.asc&limit=50&offset=100"
        );
    }
}
