// libs/contact-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

// ==============================================================================
// IDENTIFIERS
// ==============================================================================

/// Primary key of a contact row. Accepts both text and numeric keys from the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ContactId(s),
            RawId::Number(n) => ContactId(n.to_string()),
        })
    }
}

/// How a caller names a contact: by primary key or by the public uuid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactIdentifier {
    ById(ContactId),
    ByUuid(Uuid),
}

impl ContactIdentifier {
    /// Resolves a free-form identifier. Anything that is a well-formed UUID is
    /// the public token; everything else, hyphenated or not, is a primary key.
    pub fn parse(raw: &str) -> Result<Self, ContactError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ContactError::InvalidInput("Contact identifier is required".to_string()));
        }

        if trimmed.contains('-') {
            if let Ok(uuid) = Uuid::parse_str(trimmed) {
                return Ok(ContactIdentifier::ByUuid(uuid));
            }
        }

        Ok(ContactIdentifier::ById(ContactId::new(trimmed)))
    }

    /// Builds an identifier from separate `contactId` / `uuid` request fields.
    /// Exactly one of them must be present.
    pub fn from_parts(contact_id: Option<&str>, uuid: Option<&str>) -> Result<Self, ContactError> {
        match (non_blank(contact_id), non_blank(uuid)) {
            (Some(id), None) => Ok(ContactIdentifier::ById(ContactId::new(id))),
            (None, Some(token)) => Uuid::parse_str(token)
                .map(ContactIdentifier::ByUuid)
                .map_err(|_| ContactError::InvalidInput(format!("'{}' is not a valid uuid", token))),
            (Some(_), Some(_)) => Err(ContactError::InvalidInput(
                "Provide either contactId or uuid, not both".to_string(),
            )),
            (None, None) => Err(ContactError::InvalidInput(
                "Either contactId or uuid is required".to_string(),
            )),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl fmt::Display for ContactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactIdentifier::ById(id) => write!(f, "id={}", id),
            ContactIdentifier::ByUuid(uuid) => write!(f, "uuid={}", uuid),
        }
    }
}

// ==============================================================================
// STATUS ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Scheduled,
    Converted,
    Lost,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 6] = [
        ContactStatus::New,
        ContactStatus::Contacted,
        ContactStatus::Qualified,
        ContactStatus::Scheduled,
        ContactStatus::Converted,
        ContactStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Qualified => "qualified",
            ContactStatus::Scheduled => "scheduled",
            ContactStatus::Converted => "converted",
            ContactStatus::Lost => "lost",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ContactStatus::New | ContactStatus::Lost => 0,
            ContactStatus::Contacted => 1,
            ContactStatus::Qualified => 2,
            ContactStatus::Scheduled => 3,
            ContactStatus::Converted => 4,
        }
    }

    /// Status after an automatic transition towards `target`. Automation only
    /// moves forward; a lead can be lost only before it has booked.
    pub fn advanced_to(self, target: ContactStatus) -> ContactStatus {
        match target {
            ContactStatus::Lost => match self {
                ContactStatus::New | ContactStatus::Contacted | ContactStatus::Qualified => ContactStatus::Lost,
                other => other,
            },
            _ if self == ContactStatus::Lost || target.rank() > self.rank() => target,
            _ => self,
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ContactStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ContactStatus::ALL.iter().map(|s| s.as_str()).collect();
                ContactError::InvalidInput(format!(
                    "Invalid contact status '{}'. Must be one of: {}",
                    s,
                    allowed.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }

    /// Case-insensitive; `no-show` and `no show` are accepted for `NO_SHOW`.
    pub fn parse(raw: &str) -> Option<AppointmentStatus> {
        let normalized = raw.trim().to_uppercase().replace(['-', ' '], "_");
        AppointmentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
    }

    pub fn allowed_values() -> String {
        AppointmentStatus::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// CONVERSATION DATA
// ==============================================================================

/// Questions of the intake conversation, in script order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    GeorgiaLocation,
    FitOrFreeOffer,
    PrivatePayRate,
    MainFocus,
    PullForwardOffer,
}

impl QuestionId {
    pub const ALL: [QuestionId; 5] = [
        QuestionId::GeorgiaLocation,
        QuestionId::FitOrFreeOffer,
        QuestionId::PrivatePayRate,
        QuestionId::MainFocus,
        QuestionId::PullForwardOffer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionId::GeorgiaLocation => "georgia_location",
            QuestionId::FitOrFreeOffer => "fit_or_free_offer",
            QuestionId::PrivatePayRate => "private_pay_rate",
            QuestionId::MainFocus => "main_focus",
            QuestionId::PullForwardOffer => "pull_forward_offer",
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionId {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        QuestionId::ALL
            .iter()
            .copied()
            .find(|q| q.as_str() == wanted)
            .ok_or_else(|| ContactError::InvalidInput(format!("Unknown question id '{}'", wanted)))
    }
}

/// One recorded answer. Stored inside `custom_fields.conversation_responses`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub question: String,
    pub response: String,
    pub response_value: String,
    pub timestamp: DateTime<Utc>,
}

/// The `custom_fields` JSON column. Known keys are typed; anything else is
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredCustomFields", into = "StoredCustomFields")]
pub struct CustomFields {
    pub conversation_responses: BTreeMap<QuestionId, ConversationResponse>,

    /// Answers under question keys this build does not know, or whose shape
    /// does not parse. Written back unchanged.
    pub unrecognized_responses: BTreeMap<String, StoredResponse>,

    /// Last firing time per workflow rule key.
    pub workflow_marks: BTreeMap<String, DateTime<Utc>>,

    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StoredResponse {
    Recorded(ConversationResponse),
    Other(Value),
}

/// Wire shape of `CustomFields`.
#[derive(Serialize, Deserialize)]
struct StoredCustomFields {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    conversation_responses: BTreeMap<String, StoredResponse>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    workflow_marks: BTreeMap<String, DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<StoredCustomFields> for CustomFields {
    fn from(stored: StoredCustomFields) -> Self {
        let mut conversation_responses = BTreeMap::new();
        let mut unrecognized_responses = BTreeMap::new();

        for (key, response) in stored.conversation_responses {
            match (key.parse::<QuestionId>(), response) {
                (Ok(question), StoredResponse::Recorded(recorded)) => {
                    conversation_responses.insert(question, recorded);
                }
                (_, other) => {
                    warn!("Keeping unrecognized conversation response '{}' as is", key);
                    unrecognized_responses.insert(key, other);
                }
            }
        }

        Self {
            conversation_responses,
            unrecognized_responses,
            workflow_marks: stored.workflow_marks,
            extra: stored.extra,
        }
    }
}

impl From<CustomFields> for StoredCustomFields {
    fn from(fields: CustomFields) -> Self {
        let mut conversation_responses = fields.unrecognized_responses;
        conversation_responses.extend(
            fields
                .conversation_responses
                .into_iter()
                .map(|(question, response)| (question.as_str().to_string(), StoredResponse::Recorded(response))),
        );

        Self {
            conversation_responses,
            workflow_marks: fields.workflow_marks,
            extra: fields.extra,
        }
    }
}

impl CustomFields {
    pub fn last_response_at(&self) -> Option<DateTime<Utc>> {
        self.conversation_responses.values().map(|r| r.timestamp).max()
    }
}

// ==============================================================================
// CONTACT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub contact_status: ContactStatus,
    pub scheduled_appointment_at: Option<DateTime<Utc>>,
    pub appointment_status: Option<AppointmentStatus>,
    pub appointment_time_zone: Option<String>,
    pub appointment_notes: Option<String>,
    pub last_appointment_update: Option<DateTime<Utc>>,
    pub last_auto_reminder_sent: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_reminder_count: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: CustomFields,
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn identifier(&self) -> ContactIdentifier {
        ContactIdentifier::ById(self.id.clone())
    }

    pub fn matches(&self, identifier: &ContactIdentifier) -> bool {
        match identifier {
            ContactIdentifier::ById(id) => &self.id == id,
            ContactIdentifier::ByUuid(uuid) => &self.uuid == uuid,
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn has_active_appointment(&self) -> bool {
        self.appointment_status == Some(AppointmentStatus::Scheduled)
            && self.scheduled_appointment_at.is_some()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Appends a line to a free-text notes column.
pub fn append_line(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim_end).filter(|s| !s.is_empty()) {
        Some(existing) => format!("{}\n{}", existing, line),
        None => line.to_string(),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ==============================================================================
// WRITE / QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NewContact {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub contact_status: ContactStatus,
    pub custom_fields: CustomFields,
    pub notes: Option<String>,
}

/// Partial update. `None` leaves a column alone; `Some(None)` writes null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<ContactStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_appointment_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_status: Option<Option<AppointmentStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_time_zone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_appointment_update: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auto_reminder_sent: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reminder_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<CustomFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContactUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ContactUpdate::default()
    }

    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(email) = &self.email {
            contact.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
        if let Some(status) = self.contact_status {
            contact.contact_status = status;
        }
        if let Some(at) = self.scheduled_appointment_at {
            contact.scheduled_appointment_at = at;
        }
        if let Some(status) = self.appointment_status {
            contact.appointment_status = status;
        }
        if let Some(zone) = &self.appointment_time_zone {
            contact.appointment_time_zone = zone.clone();
        }
        if let Some(notes) = &self.appointment_notes {
            contact.appointment_notes = notes.clone();
        }
        if let Some(at) = self.last_appointment_update {
            contact.last_appointment_update = Some(at);
        }
        if let Some(at) = self.last_auto_reminder_sent {
            contact.last_auto_reminder_sent = at;
        }
        if let Some(count) = self.auto_reminder_count {
            contact.auto_reminder_count = count;
        }
        if let Some(fields) = &self.custom_fields {
            contact.custom_fields = fields.clone();
        }
        if let Some(notes) = &self.notes {
            contact.notes = notes.clone();
        }
        if let Some(at) = self.updated_at {
            contact.updated_at = at;
        }
    }
}

/// Filter for listing contacts, ordered ascending by appointment time.
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub appointment_status: Option<AppointmentStatus>,
    /// Only rows that have any appointment status at all.
    pub with_appointment_status: bool,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_to: Option<DateTime<Utc>>,
    pub has_conversation_responses: bool,
    pub limit: Option<usize>,
    /// Rows to skip before `limit` applies.
    pub offset: Option<usize>,
}

impl ContactQuery {
    pub fn matches(&self, contact: &Contact) -> bool {
        if let Some(status) = self.appointment_status {
            if contact.appointment_status != Some(status) {
                return false;
            }
        }
        if self.with_appointment_status && contact.appointment_status.is_none() {
            return false;
        }
        if self.scheduled_from.is_some() || self.scheduled_to.is_some() {
            let Some(at) = contact.scheduled_appointment_at else {
                return false;
            };
            if self.scheduled_from.is_some_and(|from| at < from) {
                return false;
            }
            if self.scheduled_to.is_some_and(|to| at > to) {
                return false;
            }
        }
        if self.has_conversation_responses && contact.custom_fields.conversation_responses.is_empty() {
            return false;
        }
        true
    }
}

/// Submission of the public contact or booking form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadOutcome {
    pub contact: Contact,
    pub created: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum ContactError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Contact not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_identifier_hyphenated_uuid_resolves_by_uuid() {
        let token = Uuid::new_v4();
        assert_eq!(
            ContactIdentifier::parse(&token.to_string()).unwrap(),
            ContactIdentifier::ByUuid(token)
        );
    }

    #[test]
    fn test_identifier_without_hyphen_resolves_by_id() {
        assert_eq!(
            ContactIdentifier::parse(" 42 ").unwrap(),
            ContactIdentifier::ById(ContactId::new("42"))
        );
        assert_eq!(
            ContactIdentifier::parse("c1").unwrap(),
            ContactIdentifier::ById(ContactId::new("c1"))
        );
    }

    #[test]
    fn test_hyphenated_non_uuid_key_stays_a_primary_key() {
        assert_eq!(
            ContactIdentifier::parse("legacy-key-7").unwrap(),
            ContactIdentifier::ById(ContactId::new("legacy-key-7"))
        );
    }

    #[test]
    fn test_identifier_from_parts() {
        assert!(ContactIdentifier::from_parts(None, None).is_err());
        assert!(ContactIdentifier::from_parts(Some("1"), Some("x")).is_err());
        assert!(ContactIdentifier::from_parts(None, Some("not-a-uuid")).is_err());
        assert_eq!(
            ContactIdentifier::from_parts(Some("7"), Some("  ")).unwrap(),
            ContactIdentifier::ById(ContactId::new("7"))
        );
    }

    #[test]
    fn test_appointment_status_parse() {
        assert_eq!(AppointmentStatus::parse("scheduled"), Some(AppointmentStatus::Scheduled));
        assert_eq!(AppointmentStatus::parse("No-Show"), Some(AppointmentStatus::NoShow));
        assert_eq!(AppointmentStatus::parse("NO_SHOW"), Some(AppointmentStatus::NoShow));
        assert_eq!(AppointmentStatus::parse("done"), None);
        assert_eq!(json!(AppointmentStatus::NoShow), json!("NO_SHOW"));
    }

    #[test]
    fn test_contact_status_advances_forward_only() {
        assert_eq!(ContactStatus::New.advanced_to(ContactStatus::Contacted), ContactStatus::Contacted);
        assert_eq!(ContactStatus::Scheduled.advanced_to(ContactStatus::Contacted), ContactStatus::Scheduled);
        assert_eq!(ContactStatus::Scheduled.advanced_to(ContactStatus::Lost), ContactStatus::Scheduled);
        assert_eq!(ContactStatus::Qualified.advanced_to(ContactStatus::Lost), ContactStatus::Lost);
        assert_eq!(ContactStatus::Lost.advanced_to(ContactStatus::Scheduled), ContactStatus::Scheduled);
    }

    #[test]
    fn test_contact_row_deserializes_numeric_id_and_null_custom_fields() {
        let row = json!({
            "id": 17,
            "uuid": "6c1f4e0e-3a35-4a7b-9f44-7f1b0a2d9c11",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": null,
            "contact_status": "qualified",
            "custom_fields": null,
            "auto_reminder_count": 2
        });

        let contact: Contact = serde_json::from_value(row).unwrap();
        assert_eq!(contact.id, ContactId::new("17"));
        assert_eq!(contact.contact_status, ContactStatus::Qualified);
        assert!(contact.custom_fields.conversation_responses.is_empty());
        assert_eq!(contact.first_name(), "Jane");
    }

    #[test]
    fn test_custom_fields_keep_unknown_keys() {
        let raw = json!({
            "conversation_responses": {
                "georgia_location": {
                    "question": "Are you located in Georgia?",
                    "response": "Yes",
                    "responseValue": "yes",
                    "timestamp": "2024-05-01T12:00:00Z"
                }
            },
            "utm_source": "newsletter"
        });

        let fields: CustomFields = serde_json::from_value(raw).unwrap();
        assert!(fields.conversation_responses.contains_key(&QuestionId::GeorgiaLocation));
        assert_eq!(fields.extra.get("utm_source"), Some(&json!("newsletter")));

        let back = serde_json::to_value(&fields).unwrap();
        assert_eq!(back["utm_source"], "newsletter");
        assert_eq!(back["conversation_responses"]["georgia_location"]["responseValue"], "yes");
    }

    #[test]
    fn test_retired_question_keys_still_load() {
        let raw = json!({
            "conversation_responses": {
                "georgia_location": {
                    "question": "Are you located in Georgia?",
                    "response": "Yes",
                    "responseValue": "yes",
                    "timestamp": "2024-05-01T12:00:00Z"
                },
                "insurance_provider": {
                    "question": "Which insurance do you have?",
                    "response": "Aetna",
                    "responseValue": "aetna",
                    "timestamp": "2024-04-01T12:00:00Z"
                },
                "main_focus": "anxiety"
            }
        });

        let fields: CustomFields = serde_json::from_value(raw).unwrap();
        assert_eq!(fields.conversation_responses.len(), 1);
        assert_eq!(fields.unrecognized_responses.len(), 2);
        assert_eq!(
            fields.last_response_at(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );

        let back = serde_json::to_value(&fields).unwrap();
        assert_eq!(back["conversation_responses"]["insurance_provider"]["responseValue"], "aetna");
        assert_eq!(back["conversation_responses"]["main_focus"], "anxiety");
        assert_eq!(back["conversation_responses"]["georgia_location"]["response"], "Yes");
    }

    #[test]
    fn test_update_serializes_explicit_nulls_only() {
        let update = ContactUpdate {
            scheduled_appointment_at: Some(None),
            appointment_status: Some(Some(AppointmentStatus::Cancelled)),
            ..Default::default()
        };

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, json!({
            "scheduled_appointment_at": null,
            "appointment_status": "CANCELLED"
        }));
    }
}
