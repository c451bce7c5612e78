// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use contact_cell::{Contact, ContactError, ContactId, ContactIdentifier};

pub use contact_cell::AppointmentStatus;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

pub const CANCELLED_BY_USER_NOTE: &str = "Appointment cancelled by user";
pub const COMPLETED_BY_ADMIN_NOTE: &str = "Appointment completed - marked by admin";

// ==============================================================================
// APPOINTMENT VIEW
// ==============================================================================

/// The appointment carried on a contact row, as shown to operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub contact_id: ContactId,
    pub contact_uuid: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub time_zone: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl From<&Contact> for Appointment {
    fn from(contact: &Contact) -> Self {
        Self {
            contact_id: contact.id.clone(),
            contact_uuid: contact.uuid,
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            scheduled_at: contact.scheduled_appointment_at,
            time_zone: contact.appointment_time_zone.clone(),
            status: contact.appointment_status,
            notes: contact.appointment_notes.clone(),
            last_update: contact.last_appointment_update,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAppointmentRequest {
    pub contact_id: Option<String>,
    pub uuid: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub time_zone: Option<String>,
}

/// Cancel request. `identifier` takes either form and is resolved by
/// shape; `contactId` / `uuid` name the key explicitly. The public link only
/// accepts the uuid token, see `resolve_link_token`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    pub identifier: Option<String>,
    pub contact_id: Option<String>,
    pub uuid: Option<String>,
    pub reason: Option<String>,
}

impl CancelAppointmentRequest {
    pub fn resolve_identifier(&self) -> Result<ContactIdentifier, AppointmentError> {
        match self.identifier.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) if self.contact_id.is_none() && self.uuid.is_none() => Ok(ContactIdentifier::parse(raw)?),
            Some(_) => Err(AppointmentError::InvalidInput(
                "Provide identifier, contactId or uuid, not several".to_string(),
            )),
            None => Ok(ContactIdentifier::from_parts(self.contact_id.as_deref(), self.uuid.as_deref())?),
        }
    }

    /// Primary keys are sequential, so links handed to clients must name
    /// the contact by its uuid.
    pub fn resolve_link_token(&self) -> Result<ContactIdentifier, AppointmentError> {
        match self.resolve_identifier()? {
            identifier @ ContactIdentifier::ByUuid(_) => Ok(identifier),
            ContactIdentifier::ById(_) => Err(AppointmentError::InvalidInput(
                "Cancel links must use the appointment token".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentStatusRequest {
    pub contact_id: Option<String>,
    pub uuid: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}

/// Public booking form: a lead plus an optional chosen slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub status: Option<String>,
    pub upcoming_only: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub status: Option<AppointmentStatus>,
    pub upcoming_only: bool,
    pub limit: Option<usize>,
}

impl ListFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

impl TryFrom<AppointmentListQuery> for ListFilter {
    type Error = AppointmentError;

    fn try_from(query: AppointmentListQuery) -> Result<Self, Self::Error> {
        let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_status(raw)?),
            None => None,
        };

        Ok(Self {
            status,
            upcoming_only: query.upcoming_only.unwrap_or(false),
            limit: query.limit,
        })
    }
}

pub fn parse_status(raw: &str) -> Result<AppointmentStatus, AppointmentError> {
    AppointmentStatus::parse(raw).ok_or_else(|| {
        AppointmentError::InvalidInput(format!(
            "Invalid status '{}'. Must be one of: {}",
            raw,
            AppointmentStatus::allowed_values()
        ))
    })
}

// ==============================================================================
// BOOKING RESULT
// ==============================================================================

/// Result of the confirmation send that follows a committed booking.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationOutcome {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub contact: Contact,
    pub created: bool,
    pub appointment: Option<Appointment>,
    pub notification: Option<NotificationOutcome>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Contact not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ContactError> for AppointmentError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::InvalidInput(msg) => AppointmentError::InvalidInput(msg),
            ContactError::NotFound => AppointmentError::NotFound,
            ContactError::Conflict(msg) => AppointmentError::Conflict(msg),
            ContactError::Storage(msg) => AppointmentError::Storage(msg),
        }
    }
}

impl From<contact_cell::StoreError> for AppointmentError {
    fn from(e: contact_cell::StoreError) -> Self {
        ContactError::from(e).into()
    }
}
