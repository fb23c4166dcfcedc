//! # Memoreal Gateway
//!
//! HTTP gateway for the Memoreal backend: account routes, the bearer-token
//! auth gate, and thin proxies to the image host and video generator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication: password hashing, tokens, the auth gate and sessions.
pub mod auth;
/// Media storage and third-party media proxies.
pub mod media;
mod middleware;
mod server;
/// Credential store abstraction and implementations.
pub mod store;

pub use auth::{AuthError, AuthState, PasswordHasher, RequireAuth, TokenManager};
pub use middleware::LoginRateLimiter;
pub use server::{Gateway, GatewayBuilder, GatewayState};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};

use std::sync::Arc;

use memoreal_core::Config;

/// Start the gateway server against the configured Postgres store.
///
/// The store connection is established before the listener binds; failure
/// to reach it aborts startup.
///
/// # Errors
///
/// Returns error if the store is unreachable or the server fails to start.
pub async fn start(config: Config) -> Result<(), GatewayError> {
    let store = PgCredentialStore::connect(&config.database).await?;
    let gateway = Gateway::builder()
        .with_config(config)
        .with_store(Arc::new(store))
        .build()?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Auth initialization error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}
