//! Password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use memoreal_core::AuthConfig;

use super::AuthError;

/// Salted, adaptive password hasher (Argon2id).
///
/// Digests are PHC strings carrying their own salt and parameters, so a
/// digest produced under one cost setting still verifies after the cost is
/// raised.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with explicit Argon2 parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the parameters are out of Argon2's accepted range.
    pub fn new(cost: u32, memory_kib: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, cost, parallelism, None)
            .map_err(|e| AuthError::Config(format!("Invalid hash parameters: {e}")))?;
        Ok(Self { params })
    }

    /// Create a hasher from auth configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configured parameters are invalid.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(
            config.hash_cost,
            config.hash_memory_kib,
            config.hash_parallelism,
        )
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A malformed digest never matches.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::debug!("Stored password digest is not a valid PHC string");
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash on the blocking pool so request workers are not held up.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails or the blocking task is cancelled.
    pub async fn hash_async(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(format!("Hash task failed: {e}")))?
    }

    /// Verify on the blocking pool.
    pub async fn verify_async(&self, password: String, digest: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .unwrap_or(false)
    }
}
