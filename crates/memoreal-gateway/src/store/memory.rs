//! In-memory credential store for tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use memoreal_core::UserId;
use tokio::sync::RwLock;

use super::{CredentialStore, NewUser, StoreError, User, UserProfile, UserUpdate};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    next_id: i64,
}

impl Inner {
    fn conflicts(&self, username: &str, email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.username == username || u.email == email)
    }

    fn email_taken_by_other(&self, email: &str, owner: UserId) -> bool {
        self.users.values().any(|u| u.id != owner && u.email == email)
    }
}

/// Credential store held in process memory.
///
/// Enforces the same username and email uniqueness as the database.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn count(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

fn merge(current: &mut Option<String>, change: Option<String>) {
    if change.is_some() {
        *current = change;
    }
}

fn apply_profile(current: &mut UserProfile, change: UserProfile) {
    merge(&mut current.first_name, change.first_name);
    merge(&mut current.last_name, change.last_name);
    merge(&mut current.mi, change.mi);
    merge(&mut current.contact_number, change.contact_number);
    merge(&mut current.birthdate, change.birthdate);
    merge(&mut current.picture, change.picture);
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.conflicts(username, email))
    }

    async fn insert(&self, user: NewUser) -> Result<UserId, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.conflicts(&user.username, &user.email) {
            return Err(StoreError::Conflict);
        }

        inner.next_id += 1;
        let id = UserId::new(inner.next_id);
        inner.users.insert(
            id,
            User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                profile: user.profile,
            },
        );
        Ok(id)
    }

    async fn update(&self, username: &str, update: UserUpdate) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(id) = inner
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
        else {
            return Ok(false);
        };

        if let Some(email) = &update.email {
            if inner.email_taken_by_other(email, id) {
                return Err(StoreError::Conflict);
            }
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        apply_profile(&mut user.profile, update.profile);
        Ok(true)
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
