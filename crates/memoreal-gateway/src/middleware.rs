//! Gateway middleware.

use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracked usernames before stale entries are swept.
const PRUNE_THRESHOLD: usize = 1024;

/// Throttles login attempts per username.
///
/// The keyed store is swept of entries whose quota has fully replenished
/// whenever it grows past the current threshold. The threshold then moves to
/// twice the surviving size, keeping the sweep amortized.
pub struct LoginRateLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    prune_at: AtomicUsize,
    min_prune_at: usize,
}

impl LoginRateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new(attempts_per_minute: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN));
        Self::with_quota(quota, PRUNE_THRESHOLD)
    }

    fn with_quota(quota: Quota, min_prune_at: usize) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
            prune_at: AtomicUsize::new(min_prune_at),
            min_prune_at,
        }
    }

    /// Check if another attempt for `username` is allowed.
    ///
    /// Usernames are compared case-insensitively.
    #[must_use]
    pub fn check(&self, username: &str) -> bool {
        let allowed = self.limiter.check_key(&username.to_lowercase()).is_ok();
        if self.limiter.len() >= self.prune_at.load(Ordering::Relaxed) {
            self.prune();
        }
        allowed
    }

    /// Number of usernames currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }

    fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let remaining = self.limiter.len();
        self.prune_at
            .store((remaining * 2).max(self.min_prune_at), Ordering::Relaxed);
        tracing::debug!(remaining, "Pruned login rate limiter");
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(10)
    }
}
