// libs/contact-cell/src/services/contact.rs
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::format_phone;

use crate::models::{
    append_line, normalize_email, Contact, ContactError, ContactIdentifier, ContactStatus,
    ContactUpdate, CustomFields, LeadForm, LeadOutcome, NewContact,
};
use crate::store::ContactStore;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_PATTERN.is_match(email)
}

pub struct ContactService {
    store: Arc<dyn ContactStore>,
}

impl ContactService {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_identifier(&self, identifier: &ContactIdentifier) -> Result<Contact, ContactError> {
        debug!("Looking up contact {}", identifier);
        Ok(self.store.get(identifier).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, ContactError> {
        let normalized = normalize_email(email);
        if normalized.is_empty() {
            return Err(ContactError::InvalidInput("Email is required".to_string()));
        }
        Ok(self.store.find_by_email(&normalized).await?)
    }

    pub async fn upsert_fields(
        &self,
        identifier: &ContactIdentifier,
        update: ContactUpdate,
    ) -> Result<Contact, ContactError> {
        if update.is_empty() {
            return self.find_by_identifier(identifier).await;
        }
        if let Some(email) = &update.email {
            if !is_valid_email(&normalize_email(email)) {
                return Err(ContactError::InvalidInput(format!("Invalid email address '{}'", email)));
            }
        }

        let contact = self.store.update(identifier, update).await?;
        info!("Updated contact {}", contact.id);
        Ok(contact)
    }

    /// Records a contact/booking form submission. The first submission for an
    /// email creates the contact; later ones refresh name/phone and append the
    /// message to the operator notes.
    pub async fn capture_lead(&self, form: LeadForm) -> Result<LeadOutcome, ContactError> {
        self.capture_lead_at(form, Utc::now()).await
    }

    pub async fn capture_lead_at(&self, form: LeadForm, now: DateTime<Utc>) -> Result<LeadOutcome, ContactError> {
        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(ContactError::InvalidInput("Name is required".to_string()));
        }

        let email = normalize_email(&form.email);
        if !is_valid_email(&email) {
            return Err(ContactError::InvalidInput(format!("Invalid email address '{}'", form.email)));
        }

        let phone = match form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(format_phone(raw).map_err(|e| {
                warn!("Rejected lead phone '{}': {}", raw, e);
                ContactError::InvalidInput(e.to_string())
            })?),
            None => None,
        };

        let note = form
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|message| {
                let source = form.source.as_deref().unwrap_or("website");
                format!("[{}] {} form: {}", now.format("%Y-%m-%d %H:%M UTC"), source, message)
            });

        if let Some(existing) = self.store.find_by_email(&email).await? {
            debug!("Lead {} already known as contact {}", email, existing.id);

            let update = ContactUpdate {
                name: Some(name),
                phone: phone.map(Some),
                notes: note.map(|line| Some(append_line(existing.notes.as_deref(), &line))),
                ..Default::default()
            };
            let contact = self.store.update(&existing.identifier(), update).await?;
            return Ok(LeadOutcome { contact, created: false });
        }

        let new_contact = NewContact {
            uuid: Uuid::new_v4(),
            name,
            email,
            phone,
            contact_status: ContactStatus::New,
            custom_fields: CustomFields::default(),
            notes: note,
        };

        let contact = self.store.insert(new_contact).await?;
        info!("Captured new lead as contact {}", contact.id);
        Ok(LeadOutcome { contact, created: true })
    }

    /// Administrative override; any status may be set.
    pub async fn set_contact_status(
        &self,
        identifier: &ContactIdentifier,
        status: ContactStatus,
    ) -> Result<Contact, ContactError> {
        let update = ContactUpdate {
            contact_status: Some(status),
            ..Default::default()
        };
        let contact = self.store.update(identifier, update).await?;
        info!("Contact {} status set to {}", contact.id, status);
        Ok(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("client@example.com"));
        assert!(is_valid_email("first.last+intake@sub.example.org"));
        assert!(!is_valid_email("client@example"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email(""));
    }
}
