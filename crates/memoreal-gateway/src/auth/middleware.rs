//! Authentication middleware for axum.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use memoreal_core::{ApiKey, AuthConfig, UserId};
use serde::Serialize;

use super::AuthError;
use super::jwt::TokenManager;
use super::password::PasswordHasher;
use super::session::SessionBinder;
use crate::middleware::LoginRateLimiter;

/// Message returned for every internal failure.
pub(crate) const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Please try again later.";

/// Shared authentication state.
pub struct AuthState {
    /// Auth configuration.
    pub config: AuthConfig,
    /// Token manager.
    pub tokens: TokenManager,
    /// Password hasher.
    pub hasher: PasswordHasher,
    /// Session binder.
    pub sessions: SessionBinder,
    /// Per-username login throttle.
    pub login_limiter: LoginRateLimiter,
}

impl AuthState {
    /// Create a new auth state.
    #[must_use]
    pub fn new(config: AuthConfig, tokens: TokenManager, hasher: PasswordHasher) -> Self {
        let sessions = SessionBinder::new(config.sessions_enabled);
        let login_limiter = LoginRateLimiter::new(config.login_attempts_per_minute);
        Self {
            config,
            tokens,
            hasher,
            sessions,
            login_limiter,
        }
    }

    /// Initialize auth state, auto-generating a JWT secret if none is configured.
    ///
    /// A generated secret lives only as long as the process, so tokens do
    /// not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns error if the hash parameters are invalid.
    pub fn initialize(mut config: AuthConfig) -> Result<Self, AuthError> {
        let secret = match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => ApiKey::new(secret.to_string()),
            _ => {
                let secret = TokenManager::generate_hex_secret();
                config.jwt_secret = Some(secret.clone());
                tracing::warn!(
                    "No JWT secret configured; generated an ephemeral one. \
                     Issued tokens will not survive a restart"
                );
                ApiKey::new(secret)
            }
        };

        let tokens = TokenManager::from_secret(&secret, config.token_expiry());
        let hasher = PasswordHasher::from_config(&config)?;

        Ok(Self::new(config, tokens, hasher))
    }

    /// Authorize a request from its headers.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` when no bearer token is present and
    /// `InvalidToken` when it fails verification.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(TokenManager::extract_from_header)
            .ok_or(AuthError::MissingToken)?;

        self.tokens.verify(token)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &self.tokens)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

/// Extractor for authenticated requests.
///
/// Use this in handler parameters to require authentication. The handler
/// body never runs when the token is missing or invalid.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    /// The authenticated user's id.
    pub user_id: UserId,
}

/// Error response for handler failures.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::InvalidToken(reason) => {
                tracing::debug!("Rejected token: {reason}");
                (StatusCode::FORBIDDEN, "Invalid or expired token".to_string())
            }
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::UserNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::UserExists => (StatusCode::CONFLICT, self.to_string()),
            Self::PermissionDenied(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts, try again later".to_string(),
            ),
            Self::Hashing(_) | Self::Storage(_) | Self::Config(_) => {
                tracing::error!("Request failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

/// Extractor implementation for `RequireAuth`.
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    Arc<AuthState>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = Arc::<AuthState>::from_ref(state);
        let user_id = auth_state.authorize(&parts.headers)?;
        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;

    use super::*;

    fn state() -> AuthState {
        let config = AuthConfig::builder()
            .jwt_secret("test-secret-test-secret-test-secret")
            .hash_params(1, 1024, 1)
            .build();
        AuthState::initialize(config).unwrap()
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_header() {
        let auth = state();
        assert!(matches!(
            auth.authorize(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_wrong_scheme_is_missing() {
        let auth = state();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            auth.authorize(&headers),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_valid_token() {
        let auth = state();
        let issued = auth.tokens.issue(UserId::new(11)).unwrap();
        assert_eq!(
            auth.authorize(&bearer(&issued.token)).unwrap(),
            UserId::new(11)
        );
    }

    #[test]
    fn test_invalid_token() {
        let auth = state();
        assert!(matches!(
            auth.authorize(&bearer("bogus")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_generated_secret() {
        let config = AuthConfig::builder().hash_params(1, 1024, 1).build();
        let auth = AuthState::initialize(config).unwrap();

        assert_eq!(auth.config.jwt_secret.as_deref().map(str::len), Some(64));
        let issued = auth.tokens.issue(UserId::new(1)).unwrap();
        assert!(auth.tokens.verify(&issued.token).is_ok());
    }

    #[test]
    fn test_token_expiry_from_config() {
        let config = AuthConfig::builder()
            .jwt_secret("s")
            .token_expiry_secs(120)
            .hash_params(1, 1024, 1)
            .build();
        let auth = AuthState::initialize(config).unwrap();
        assert_eq!(auth.tokens.expiry(), Duration::from_secs(120));
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken("x".into()), StatusCode::FORBIDDEN),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::UserExists, StatusCode::CONFLICT),
            (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                AuthError::Storage("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
