use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    normalize_email, Contact, ContactId, ContactIdentifier, ContactQuery, ContactStatus,
    ContactUpdate, CustomFields, NewContact,
};
use crate::store::{ContactStore, StoreError};

/// Process-local store for tests and `STORE_BACKEND=memory` development runs.
#[derive(Default)]
pub struct InMemoryContactStore {
    contacts: RwLock<Vec<Contact>>,
    next_id: AtomicU64,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            next_id: AtomicU64::new(contacts.len() as u64 + 1),
            contacts: RwLock::new(contacts),
            ..Default::default()
        }
    }

    pub async fn seed(&self, contact: Contact) {
        self.contacts.write().await.push(contact);
    }

    pub async fn snapshot(&self, identifier: &ContactIdentifier) -> Option<Contact> {
        self.contacts.read().await.iter().find(|c| c.matches(identifier)).cloned()
    }

    /// Number of successful inserts and updates so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every later insert/update fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("simulated write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn get(&self, identifier: &ContactIdentifier) -> Result<Contact, StoreError> {
        self.snapshot(identifier).await.ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, StoreError> {
        let wanted = normalize_email(email);
        Ok(self
            .contacts
            .read()
            .await
            .iter()
            .find(|c| normalize_email(&c.email) == wanted)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError> {
        Ok(self
            .contacts
            .read()
            .await
            .iter()
            .find(|c| c.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn query(&self, query: &ContactQuery) -> Result<Vec<Contact>, StoreError> {
        let mut matched: Vec<Contact> = self
            .contacts
            .read()
            .await
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();

        // Ascending with nulls last, ties by id, same as the hosted query.
        matched.sort_by(|a, b| {
            (a.scheduled_appointment_at.is_none(), a.scheduled_appointment_at, &a.id)
                .cmp(&(b.scheduled_appointment_at.is_none(), b.scheduled_appointment_at, &b.id))
        });
        let rows = matched.into_iter().skip(query.offset.unwrap_or(0));
        Ok(match query.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn update(&self, identifier: &ContactIdentifier, update: ContactUpdate) -> Result<Contact, StoreError> {
        self.check_writable()?;
        let mut contacts = self.contacts.write().await;

        if let Some(email) = &update.email {
            let wanted = normalize_email(email);
            if contacts.iter().any(|c| !c.matches(identifier) && normalize_email(&c.email) == wanted) {
                return Err(StoreError::Conflict(format!("email {} already in use", wanted)));
            }
        }

        let contact = contacts
            .iter_mut()
            .find(|c| c.matches(identifier))
            .ok_or(StoreError::NotFound)?;

        update.apply_to(contact);
        contact.email = normalize_email(&contact.email);
        if update.updated_at.is_none() {
            contact.updated_at = Utc::now();
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(contact.clone())
    }

    async fn insert(&self, new_contact: NewContact) -> Result<Contact, StoreError> {
        self.check_writable()?;
        let mut contacts = self.contacts.write().await;

        let email = normalize_email(&new_contact.email);
        if contacts.iter().any(|c| normalize_email(&c.email) == email) {
            return Err(StoreError::Conflict(format!("email {} already in use", email)));
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let contact = Contact {
            id: ContactId::new(id.to_string()),
            uuid: new_contact.uuid,
            name: new_contact.name,
            email,
            phone: new_contact.phone,
            contact_status: new_contact.contact_status,
            scheduled_appointment_at: None,
            appointment_status: None,
            appointment_time_zone: None,
            appointment_notes: None,
            last_appointment_update: None,
            last_auto_reminder_sent: None,
            auto_reminder_count: 0,
            custom_fields: new_contact.custom_fields,
            notes: new_contact.notes,
            created_at: now,
            updated_at: now,
        };

        contacts.push(contact.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(contact)
    }
}

/// A fresh lead with the given primary key, for seeding stores in tests.
pub fn contact_fixture(id: &str, email: &str) -> Contact {
    let now = Utc::now();
    Contact {
        id: ContactId::new(id),
        uuid: Uuid::new_v4(),
        name: "Jordan Rivers".to_string(),
        email: normalize_email(email),
        phone: Some("404-555-0101".to_string()),
        contact_status: ContactStatus::New,
        scheduled_appointment_at: None,
        appointment_status: None,
        appointment_time_zone: None,
        appointment_notes: None,
        last_appointment_update: None,
        last_auto_reminder_sent: None,
        auto_reminder_count: 0,
        custom_fields: CustomFields::default(),
        notes: None,
        created_at: now,
        updated_at: now,
    }
}
