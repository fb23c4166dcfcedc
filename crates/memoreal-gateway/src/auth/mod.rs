//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - JWT issue and verification
//! - The `RequireAuth` extractor guarding protected routes
//! - Optional cookie-session binding after login

mod jwt;
mod middleware;
mod password;
mod session;

pub use jwt::{Claims, IssuedToken, TokenManager};
pub use middleware::{AuthState, RequireAuth};
pub(crate) use middleware::{ErrorBody, INTERNAL_ERROR_MESSAGE};
pub use password::PasswordHasher;
pub use session::{SESSION_USER_ID_KEY, SessionBinder};

use memoreal_core::ValidationError;
use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("Authentication required")]
    MissingToken,

    /// Token failed signature or expiry checks, or was malformed.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Password did not match the stored digest.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No account with the given username or id.
    #[error("User not found")]
    UserNotFound,

    /// Username or email already registered.
    #[error("Username or Email is already taken")]
    UserExists,

    /// Authenticated caller may not act on the target account.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// Too many login attempts for one username.
    #[error("Too many login attempts")]
    RateLimited,

    /// Password hashing failed.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::UserExists,
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
