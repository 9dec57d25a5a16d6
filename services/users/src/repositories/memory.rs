//! In-process user store

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::{UserError, UserResult},
    models::{
        NewUser, User, UserId,
        user::{next_modification, normalize_email, now},
    },
};

#[derive(Debug, Default)]
struct Records {
    users: HashMap<UserId, User>,
    /// Normalized email -> owner
    emails: HashMap<String, UserId>,
}

/// User store holding records in memory
///
/// Every uniqueness check happens under the same lock as the write it
/// guards.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    records: Arc<Mutex<Records>>,
}

impl MemoryUserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> UserResult<User> {
        info!("Creating new user: {}", new_user.email);

        let mut records = self.records.lock().await;
        let key = normalize_email(&new_user.email);
        if records.emails.contains_key(&key) {
            return Err(UserError::DuplicateEmail(new_user.email));
        }

        let mut id = Uuid::new_v4();
        while records.users.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let user = new_user.into_user(id, now());
        records.emails.insert(key, id);
        records.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        info!("Updating user: {}", user.id);

        let mut records = self.records.lock().await;
        let Records { users, emails } = &mut *records;

        let existing = users.get_mut(&user.id).ok_or(UserError::NotFound(user.id))?;

        let key = normalize_email(&user.email);
        if matches!(emails.get(&key), Some(owner) if *owner != user.id) {
            return Err(UserError::DuplicateEmail(user.email.clone()));
        }

        let previous_key = normalize_email(&existing.email);
        if previous_key != key {
            emails.remove(&previous_key);
            emails.insert(key, user.id);
        }

        *existing = User {
            created_at: existing.created_at,
            updated_at: next_modification(existing.updated_at),
            ..user.clone()
        };

        Ok(existing.clone())
    }

    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let records = self.records.lock().await;
        Ok(records.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let records = self.records.lock().await;
        Ok(records
            .emails
            .get(&normalize_email(email))
            .and_then(|id| records.users.get(id))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> UserResult<bool> {
        let records = self.records.lock().await;
        Ok(records.emails.contains_key(&normalize_email(email)))
    }

    async fn find_by_library_id(&self, library_id: &str) -> UserResult<Vec<User>> {
        let records = self.records.lock().await;
        Ok(records
            .users
            .values()
            .filter(|user| user.shared_library_ids.contains(library_id))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        let records = self.records.lock().await;
        Ok(records.users.values().cloned().collect())
    }

    async fn count(&self) -> UserResult<u64> {
        let records = self.records.lock().await;
        Ok(records.users.len() as u64)
    }

    async fn delete(&self, id: UserId) -> UserResult<()> {
        info!("Deleting user: {}", id);

        let mut records = self.records.lock().await;
        if let Some(user) = records.users.remove(&id) {
            records.emails.remove(&normalize_email(&user.email));
        }

        Ok(())
    }

    async fn delete_all(&self) -> UserResult<()> {
        info!("Deleting all users");

        let mut records = self.records.lock().await;
        records.users.clear();
        records.emails.clear();

        Ok(())
    }
}
