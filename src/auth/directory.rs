//! User directory contract and the in-memory implementation.
//!
//! The directory owns the uniqueness invariant: `insert` must reject a record
//! whose email or username is already stored, even if the caller's pre-check
//! raced with another insert.

use super::{DirectoryError, NewUser, UserRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Number of records whose email equals `email` OR whose username equals
    /// `username`.
    async fn count_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<u64, DirectoryError>;

    /// Store a new record and return its id.
    ///
    /// Returns [`DirectoryError::Duplicate`] when the email or username is
    /// already taken.
    async fn insert(&self, user: NewUser) -> Result<Uuid, DirectoryError>;

    /// Find the record whose email or username equals `identifier`.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Process-local directory. The duplicate check and the write happen under a
/// single write lock.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Flip the active flag of a stored record, returning `false` if no
    /// record has that id.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(record) => {
                record.is_active = is_active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn count_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<u64, DirectoryError> {
        let users = self.users.read().await;
        let count = users
            .values()
            .filter(|user| user.email == email || user.username == username)
            .count();
        Ok(count as u64)
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid, DirectoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email == user.email || existing.username == user.username)
        {
            return Err(DirectoryError::Duplicate);
        }

        let id = Uuid::new_v4();
        users.insert(id, user.into_record(id));
        Ok(id)
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().await;
        // An email match wins over a username match.
        let found = users
            .values()
            .find(|user| user.email == identifier)
            .or_else(|| users.values().find(|user| user.username == identifier));
        Ok(found.cloned())
    }
}
