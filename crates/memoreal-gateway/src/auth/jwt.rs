//! JWT token management.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use memoreal_core::{ApiKey, UserId};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::AuthError;

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was issued to.
    pub id: UserId,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// A freshly issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// Token expiration.
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 access tokens.
///
/// The same secret signs and verifies; a token signed under any other
/// secret is rejected.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl TokenManager {
    /// Create a token manager with a secret key.
    ///
    /// The secret should be at least 32 bytes for security.
    #[must_use]
    pub fn new(secret: &[u8], expiry: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expiry,
        }
    }

    /// Create a token manager from a configured secret.
    #[must_use]
    pub fn from_secret(secret: &ApiKey, expiry: Duration) -> Self {
        Self::new(secret.expose().as_bytes(), expiry)
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Generate a random secret as hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        hex::encode(Self::generate_secret())
    }

    /// Token lifetime.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue an access token for a user.
    ///
    /// # Errors
    ///
    /// Returns error if the expiry is out of range or token encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(self.expiry)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Config(format!(
                    "Token expiry of {}s is out of range",
                    self.expiry.as_secs()
                ))
            })?;

        let claims = Claims {
            id: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        Ok(IssuedToken {
            token: self.encode_claims(&claims)?,
            expires_at,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Config(format!("Token encoding failed: {e}")))
    }

    /// Verify a token and return the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is malformed, expired, or signed
    /// under a different secret.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.id)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Extract token from an Authorization header value.
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(&TokenManager::generate_secret(), Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = manager();
        let issued = tokens.issue(UserId::new(42)).unwrap();

        assert_eq!(tokens.verify(&issued.token).unwrap(), UserId::new(42));
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn test_claims_shape() {
        let tokens = manager();
        let issued = tokens.issue(UserId::new(7)).unwrap();
        let data = decode::<serde_json::Value>(
            &issued.token,
            &tokens.decoding_key,
            &tokens.validation,
        )
        .unwrap();

        assert_eq!(data.claims["id"], 7);
        let iat = data.claims["iat"].as_i64().unwrap();
        let exp = data.claims["exp"].as_i64().unwrap();
        assert_eq!(exp - iat, 3600);
    }

    #[test]
    fn test_out_of_range_expiry_is_config_error() {
        let secret = TokenManager::generate_secret();
        for secs in [10_000_000_000_000, u64::MAX] {
            let tokens = TokenManager::new(&secret, Duration::from_secs(secs));
            assert!(matches!(
                tokens.issue(UserId::new(1)),
                Err(AuthError::Config(_))
            ));
        }
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = manager();
        let now = Utc::now().timestamp();
        let token = tokens
            .encode_claims(&Claims {
                id: UserId::new(1),
                iat: now - 3610,
                exp: now - 10,
            })
            .unwrap();

        assert!(matches!(
            tokens.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let issuer = TokenManager::new(b"first-secret-first-secret-first!", Duration::from_secs(60));
        let verifier =
            TokenManager::new(b"other-secret-other-secret-other!", Duration::from_secs(60));
        let issued = issuer.issue(UserId::new(1)).unwrap();

        assert!(matches!(
            verifier.verify(&issued.token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let tokens = manager();
        assert!(tokens.verify("").is_err());
        assert!(tokens.verify("not.a.jwt").is_err());
        assert!(tokens.verify("garbage").is_err());
    }

    #[test]
    fn test_from_secret() {
        let secret = ApiKey::new("configured-secret".to_string());
        let a = TokenManager::from_secret(&secret, Duration::from_secs(60));
        let b = TokenManager::from_secret(&secret, Duration::from_secs(60));
        let issued = a.issue(UserId::new(3)).unwrap();
        assert_eq!(b.verify(&issued.token).unwrap(), UserId::new(3));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(TokenManager::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(TokenManager::extract_from_header("bearer abc"), Some("abc"));
        assert_eq!(TokenManager::extract_from_header("Bearer "), None);
        assert_eq!(TokenManager::extract_from_header("Basic abc"), None);
        assert_eq!(TokenManager::extract_from_header("abc"), None);
    }

    #[test]
    fn test_hex_secret_length() {
        assert_eq!(TokenManager::generate_hex_secret().len(), 64);
    }
}
