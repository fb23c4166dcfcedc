//! Cookie-session binding.
//!
//! A session is a convenience for browser clients; the bearer token stays
//! the authority for protected routes.

use memoreal_core::UserId;
use tower_sessions::Session;

/// Session key holding the logged-in user's id.
pub const SESSION_USER_ID_KEY: &str = "userId";

/// Records the authenticated user on the request's session, when one exists.
#[derive(Debug, Clone, Copy)]
pub struct SessionBinder {
    enabled: bool,
}

impl SessionBinder {
    /// Create a binder.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether sessions are enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bind `user_id` to the session.
    ///
    /// Failure is logged and swallowed so login still succeeds.
    pub async fn bind(&self, session: Option<&Session>, user_id: UserId) {
        let Some(session) = session.filter(|_| self.enabled) else {
            return;
        };
        if let Err(e) = session.insert(SESSION_USER_ID_KEY, user_id).await {
            tracing::warn!(%user_id, "Failed to bind session: {e}");
        }
    }

    /// The user id bound to the session, if any.
    pub async fn bound_user(&self, session: Option<&Session>) -> Option<UserId> {
        let session = session.filter(|_| self.enabled)?;
        match session.get::<UserId>(SESSION_USER_ID_KEY).await {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!("Failed to read session: {e}");
                None
            }
        }
    }

    /// Destroy the session.
    pub async fn clear(&self, session: Option<&Session>) {
        let Some(session) = session.filter(|_| self.enabled) else {
            return;
        };
        if let Err(e) = session.flush().await {
            tracing::warn!("Failed to clear session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_bind_and_read() {
        let binder = SessionBinder::new(true);
        let session = session();

        binder.bind(Some(&session), UserId::new(5)).await;
        assert_eq!(binder.bound_user(Some(&session)).await, Some(UserId::new(5)));
    }

    #[tokio::test]
    async fn test_disabled_binder_is_noop() {
        let binder = SessionBinder::new(false);
        let session = session();

        binder.bind(Some(&session), UserId::new(5)).await;
        assert_eq!(SessionBinder::new(true).bound_user(Some(&session)).await, None);
    }

    #[tokio::test]
    async fn test_missing_session_is_noop() {
        let binder = SessionBinder::new(true);
        binder.bind(None, UserId::new(5)).await;
        assert_eq!(binder.bound_user(None).await, None);
    }

    #[tokio::test]
    async fn test_clear() {
        let binder = SessionBinder::new(true);
        let session = session();

        binder.bind(Some(&session), UserId::new(9)).await;
        binder.clear(Some(&session)).await;
        assert_eq!(binder.bound_user(Some(&session)).await, None);
    }
}
