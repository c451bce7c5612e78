use async_trait::async_trait;
use thiserror::Error;

use shared_database::DatabaseError;

use crate::models::{Contact, ContactError, ContactIdentifier, ContactQuery, ContactUpdate, NewContact};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryContactStore;
pub use supabase::SupabaseContactStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Contact not found")]
    NotFound,

    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for ContactError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ContactError::NotFound,
            StoreError::Conflict(msg) => ContactError::Conflict(msg),
            StoreError::Storage(msg) => ContactError::Storage(msg),
        }
    }
}

/// Durable access to contact rows. Every mutation is a single-row write.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn get(&self, identifier: &ContactIdentifier) -> Result<Contact, StoreError>;

    /// Exact match after lowercase + trim.
    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, StoreError>;

    /// Match on the stored `XXX-XXX-XXXX` phone.
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError>;

    async fn query(&self, query: &ContactQuery) -> Result<Vec<Contact>, StoreError>;

    async fn update(&self, identifier: &ContactIdentifier, update: ContactUpdate) -> Result<Contact, StoreError>;

    async fn insert(&self, contact: NewContact) -> Result<Contact, StoreError>;
}
