//! Rate limiting middleware
//!
//! Keyed limiter used to throttle verification emails per address.

use std::num::NonZeroU32;
use std::sync::Arc;
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use tracing::{debug, warn};
use crate::utils::errors::{SportsHubError, Result};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-key limiter allowing a fixed number of hits per hour
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<KeyedLimiter>,
    per_hour: u32,
}

impl RateLimitMiddleware {
    pub fn per_hour(per_hour: u32) -> Self {
        let burst = NonZeroU32::new(per_hour).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_hour(burst).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            per_hour: burst.get(),
        }
    }

    /// Count one hit for `key`, failing once the quota is spent
    pub fn check(&self, key: &str) -> Result<()> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => {
                debug!(key = key, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(key = key, per_hour = self.per_hour, "Rate limit exceeded");
                Err(SportsHubError::RateLimitExceeded)
            }
        }
    }

    /// Drop state for keys whose quota has fully replenished
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        debug!(tracked_keys = self.limiter.len(), "Rate limiter cleaned up");
    }
}

impl std::fmt::Debug for RateLimitMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitMiddleware").field("per_hour", &self.per_hour).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_per_key() {
        let limiter = RateLimitMiddleware::per_hour(2);
        assert!(limiter.check("ana@example.com").is_ok());
        assert!(limiter.check("ana@example.com").is_ok());
        assert!(limiter.check("ana@example.com").is_err());
        assert!(limiter.check("luis@example.com").is_ok());
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let limiter = RateLimitMiddleware::per_hour(0);
        assert!(limiter.check("ana@example.com").is_ok());
        assert!(limiter.check("ana@example.com").is_err());
    }
}
