// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use contact_cell::{Contact, ContactService, LeadForm};
use notification_cell::templates::{booking_confirmation, format_appointment_time};
use notification_cell::NotificationSender;
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError, BookingOutcome, BookingRequest, NotificationOutcome};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Booking form flow: capture the lead, open the appointment, then confirm
/// by email. The store writes are the source of truth; a failed confirmation
/// is reported alongside them rather than undoing them.
pub struct AppointmentBookingService {
    contacts: Arc<ContactService>,
    lifecycle: Arc<AppointmentLifecycleService>,
    notifier: Arc<dyn NotificationSender>,
    practice_name: String,
    site_url: String,
}

impl AppointmentBookingService {
    pub fn new(
        config: &AppConfig,
        contacts: Arc<ContactService>,
        lifecycle: Arc<AppointmentLifecycleService>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            contacts,
            lifecycle,
            notifier,
            practice_name: config.practice_name.clone(),
            site_url: config.site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn cancel_url(&self, contact: &Contact) -> String {
        format!("{}/appointments/cancel?id={}", self.site_url, contact.uuid)
    }

    pub async fn book(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<BookingOutcome, AppointmentError> {
        if let Some(at) = request.scheduled_at {
            if at <= now {
                return Err(AppointmentError::InvalidInput(
                    "Appointment time must be in the future".to_string(),
                ));
            }

            // One active appointment per contact; public bookings never replace one.
            if let Some(existing) = self.contacts.find_by_email(&request.email).await? {
                if existing.has_active_appointment()
                    && existing.scheduled_appointment_at.is_some_and(|current| current > now)
                {
                    warn!("Booking refused for contact {}: appointment already scheduled", existing.id);
                    return Err(AppointmentError::Conflict(
                        "You already have an upcoming appointment. Please cancel it before booking another."
                            .to_string(),
                    ));
                }
            }
        }

        let lead = self
            .contacts
            .capture_lead_at(
                LeadForm {
                    name: request.name,
                    email: request.email,
                    phone: request.phone,
                    message: request.message,
                    source: Some("booking".to_string()),
                },
                now,
            )
            .await?;

        let Some(at) = request.scheduled_at else {
            info!("Booking request without a slot recorded for contact {}", lead.contact.id);
            return Ok(BookingOutcome {
                contact: lead.contact,
                created: lead.created,
                appointment: None,
                notification: None,
            });
        };

        let contact = self
            .lifecycle
            .schedule(&lead.contact.identifier(), at, request.time_zone.as_deref(), now)
            .await?;

        let notification = self.send_confirmation(&contact).await;

        Ok(BookingOutcome {
            appointment: Some(Appointment::from(&contact)),
            contact,
            created: lead.created,
            notification: Some(notification),
        })
    }

    async fn send_confirmation(&self, contact: &Contact) -> NotificationOutcome {
        let Some(at) = contact.scheduled_appointment_at else {
            return NotificationOutcome { sent: false, id: None, error: Some("No appointment time".to_string()) };
        };

        let when = format_appointment_time(at, contact.appointment_time_zone.as_deref());
        let notice = booking_confirmation(&self.practice_name, contact.first_name(), &when, &self.cancel_url(contact));

        match self.notifier.send_email(&contact.email, &notice.subject, &notice.html).await {
            Ok(receipt) => {
                info!("Booking confirmation sent to contact {}", contact.id);
                NotificationOutcome { sent: true, id: Some(receipt.id), error: None }
            }
            Err(e) => {
                error!("Booking confirmation for contact {} failed: {}", contact.id, e);
                NotificationOutcome { sent: false, id: None, error: Some(e.to_string()) }
            }
        }
    }
}
