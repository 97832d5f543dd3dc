//! In-memory storage for the local mailer.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::email::Email;

/// A stored email with metadata.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    /// Unique identifier for this email.
    pub id: String,
    /// The email content.
    pub email: Email,
}

/// Thread-safe in-memory storage for emails, in delivery order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    emails: RwLock<Vec<StoredEmail>>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store an email and return its ID.
    pub fn push(&self, email: Email) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.emails.write().push(StoredEmail {
            id: id.clone(),
            email,
        });
        id
    }

    /// Get an email by ID.
    pub fn get(&self, id: &str) -> Option<StoredEmail> {
        self.emails.read().iter().find(|e| e.id == id).cloned()
    }

    /// All stored emails, newest first.
    pub fn all(&self) -> Vec<StoredEmail> {
        self.emails.read().iter().rev().cloned().collect()
    }

    /// Number of stored emails.
    pub fn count(&self) -> usize {
        self.emails.read().len()
    }
}
