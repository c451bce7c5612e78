// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use contact_cell::{append_line, Contact, ContactIdentifier, ContactQuery, ContactStatus, ContactStore, ContactUpdate};

use crate::models::{
    parse_status, Appointment, AppointmentError, AppointmentStatus, ListFilter, CANCELLED_BY_USER_NOTE,
    COMPLETED_BY_ADMIN_NOTE,
};

/// Appointment state carried on the contact row. Every mutation is one
/// store update; nothing here spans rows.
pub struct AppointmentLifecycleService {
    store: Arc<dyn ContactStore>,
    default_time_zone: String,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn ContactStore>, default_time_zone: impl Into<String>) -> Self {
        Self {
            store,
            default_time_zone: default_time_zone.into(),
        }
    }

    /// Opens a fresh appointment window. Rescheduling a terminal appointment
    /// goes through here as well.
    pub async fn schedule(
        &self,
        identifier: &ContactIdentifier,
        when: DateTime<Utc>,
        time_zone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Contact, AppointmentError> {
        if when <= now {
            warn!("Rejected scheduling {} for {}: not in the future", when, identifier);
            return Err(AppointmentError::InvalidInput(
                "Appointment time must be in the future".to_string(),
            ));
        }

        let time_zone = time_zone
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .unwrap_or(&self.default_time_zone)
            .to_string();

        let contact = self.store.get(identifier).await?;

        let update = ContactUpdate {
            scheduled_appointment_at: Some(Some(when)),
            appointment_status: Some(Some(AppointmentStatus::Scheduled)),
            appointment_time_zone: Some(Some(time_zone)),
            appointment_notes: Some(None),
            last_appointment_update: Some(now),
            last_auto_reminder_sent: Some(None),
            contact_status: Some(contact.contact_status.advanced_to(ContactStatus::Scheduled)),
            ..Default::default()
        };

        let updated = self.store.update(&contact.identifier(), update).await?;
        info!("Scheduled appointment for contact {} at {}", updated.id, when);
        Ok(updated)
    }

    /// Idempotent: an appointment already in a terminal state (cancelled,
    /// completed or no-show) is returned untouched.
    pub async fn cancel(
        &self,
        identifier: &ContactIdentifier,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Contact, AppointmentError> {
        let contact = self.store.get(identifier).await?;

        if let Some(status) = contact.appointment_status.filter(AppointmentStatus::is_terminal) {
            debug!("Appointment for contact {} already {}, nothing to cancel", contact.id, status);
            return Ok(contact);
        }

        let note = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(CANCELLED_BY_USER_NOTE)
            .to_string();

        let update = ContactUpdate {
            scheduled_appointment_at: Some(None),
            appointment_status: Some(Some(AppointmentStatus::Cancelled)),
            appointment_notes: Some(Some(note)),
            last_appointment_update: Some(now),
            ..Default::default()
        };

        let updated = self.store.update(&contact.identifier(), update).await?;
        info!("Cancelled appointment for contact {}", updated.id);
        Ok(updated)
    }

    /// Administrative status change. `status` is matched case-insensitively.
    pub async fn set_status(
        &self,
        identifier: &ContactIdentifier,
        status: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Contact, AppointmentError> {
        let status = parse_status(status)?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        let contact = self.store.get(identifier).await?;

        let mut update = ContactUpdate {
            appointment_status: Some(Some(status)),
            last_appointment_update: Some(now),
            appointment_notes: notes.map(|n| Some(n.to_string())),
            ..Default::default()
        };

        match status {
            AppointmentStatus::Scheduled => {
                if contact.scheduled_appointment_at.is_none() {
                    return Err(AppointmentError::InvalidInput(
                        "Cannot mark as SCHEDULED without an appointment time; schedule it instead".to_string(),
                    ));
                }
                update.contact_status = Some(contact.contact_status.advanced_to(ContactStatus::Scheduled));
            }
            AppointmentStatus::Completed => {
                if notes.is_none() {
                    update.appointment_notes = Some(Some(append_line(
                        contact.appointment_notes.as_deref(),
                        COMPLETED_BY_ADMIN_NOTE,
                    )));
                }
                update.contact_status = Some(contact.contact_status.advanced_to(ContactStatus::Converted));
            }
            AppointmentStatus::Cancelled => {
                update.scheduled_appointment_at = Some(None);
            }
            AppointmentStatus::Pending | AppointmentStatus::NoShow => {}
        }

        let updated = self.store.update(&contact.identifier(), update).await?;
        info!("Appointment status for contact {} set to {}", updated.id, status);
        Ok(updated)
    }

    pub async fn list_appointments(
        &self,
        filter: &ListFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = ContactQuery {
            appointment_status: filter.status,
            with_appointment_status: true,
            scheduled_from: filter.upcoming_only.then_some(now),
            limit: Some(filter.effective_limit()),
            ..Default::default()
        };

        debug!("Listing appointments with {:?}", filter);
        let contacts = self.store.query(&query).await?;

        Ok(contacts.iter().map(Appointment::from).collect())
    }
}
