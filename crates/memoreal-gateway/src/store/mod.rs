//! Credential store.
//!
//! The gateway only needs lookup by username or id, an availability check,
//! and insert/update/delete. Anything that implements [`CredentialStore`]
//! can back it.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use async_trait::async_trait;
use memoreal_core::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Username or email already exists.
    #[error("Username or email already exists")]
    Conflict,

    /// Query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Optional profile columns shared by registration and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Middle initial.
    pub mi: Option<String>,
    /// Contact number.
    pub contact_number: Option<String>,
    /// Birthdate as supplied by the client.
    pub birthdate: Option<String>,
    /// Picture URL.
    pub picture: Option<String>,
}

/// A stored account, including its password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store-assigned id.
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Unique email.
    pub email: String,
    /// Password digest (PHC string).
    pub password_hash: String,
    /// Profile fields.
    pub profile: UserProfile,
}

impl User {
    /// Convert to the public representation, dropping the digest.
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            mi: self.profile.mi.clone(),
            contact_number: self.profile.contact_number.clone(),
            birthdate: self.profile.birthdate.clone(),
            picture: self.profile.picture.clone(),
        }
    }
}

/// Account data safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PublicUser {
    /// Store-assigned id.
    #[serde(rename = "USERID")]
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Middle initial.
    pub mi: Option<String>,
    /// Contact number.
    pub contact_number: Option<String>,
    /// Birthdate.
    pub birthdate: Option<String>,
    /// Picture URL.
    pub picture: Option<String>,
}

/// A validated registration, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique username.
    pub username: String,
    /// Unique email.
    pub email: String,
    /// Password digest.
    pub password_hash: String,
    /// Profile fields.
    pub profile: UserProfile,
}

/// Changes to an existing account.
///
/// `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New email.
    pub email: Option<String>,
    /// New password digest.
    pub password_hash: Option<String>,
    /// Profile changes.
    pub profile: UserProfile,
}

/// Storage backend for accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Find an account by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// List all accounts.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Whether the username or the email is already registered.
    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, StoreError>;

    /// Insert a new account.
    ///
    /// Returns `StoreError::Conflict` when the username or email exists.
    async fn insert(&self, user: NewUser) -> Result<UserId, StoreError>;

    /// Update the account with `username`. Returns `false` if none exists.
    async fn update(&self, username: &str, update: UserUpdate) -> Result<bool, StoreError>;

    /// Delete an account. Returns `false` if none exists.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
