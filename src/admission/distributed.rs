//! Fixed window rate limiting over the shared store.
//!
//! Uses INCR on `ratelimit:<key>`; the first request of a window sets the
//! key's expiry once. Store failures and an open breaker fail open.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::admission::rate_limit::RateLimiter;
use crate::observability::metrics;
use crate::resilience::{BreakerError, CircuitBreaker};
use crate::store::Store;

const KEY_PREFIX: &str = "ratelimit:";

/// Limiter whose counters live in the external store, shared by all instances.
pub struct StoreRateLimiter {
    store: Arc<dyn Store>,
    breaker: Arc<CircuitBreaker>,
}

impl StoreRateLimiter {
    pub fn new(store: Arc<dyn Store>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { store, breaker }
    }

    /// Give a counter with no expiry a fresh window.
    ///
    /// Only reachable when both the first EXPIRE and the cleanup DEL failed;
    /// without it the client would stay blocked for good.
    async fn ensure_expiry(&self, store_key: &str, client: &str, window: Duration) {
        match self.breaker.execute(|| self.store.ttl(store_key)).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(client = %client, breaker = self.breaker.name(), "Rate limit counter had no expiry, restoring window");
                if let Err(e) = self.breaker.execute(|| self.store.expire(store_key, window)).await {
                    tracing::warn!(client = %client, error = %e, "Failed to restore rate limit window expiry");
                }
            }
            Err(e) => tracing::debug!(client = %client, error = %e, "Could not read rate limit counter expiry"),
        }
    }
}

#[async_trait]
impl RateLimiter for StoreRateLimiter {
    async fn is_allowed(&self, key: &str, limit: u32, window: Duration) -> bool {
        let store_key = format!("{KEY_PREFIX}{key}");

        let count = match self.breaker.execute(|| self.store.incr(&store_key)).await {
            Ok(count) => count,
            Err(e) => {
                match &e {
                    BreakerError::Open => tracing::debug!(client = %key, "Store breaker open, allowing request"),
                    _ => tracing::warn!(client = %key, error = %e, "Rate limit store unavailable, allowing request"),
                }
                metrics::record_rate_limit_fail_open();
                return true;
            }
        };

        // Only the first request of a window sets the expiry, so later
        // requests can never push the reset back.
        if count == 1 {
            if let Err(e) = self.breaker.execute(|| self.store.expire(&store_key, window)).await {
                tracing::warn!(client = %key, error = %e, "Failed to set rate limit window expiry, discarding counter");
                if let Err(e) = self.breaker.execute(|| self.store.delete(&store_key)).await {
                    tracing::warn!(client = %key, error = %e, "Failed to discard rate limit counter");
                }
            }
        }

        if count > i64::from(limit) {
            self.ensure_expiry(&store_key, key, window).await;
            tracing::warn!(client = %key, limit, count, "Rate limit exceeded");
            metrics::record_rate_limited("store");
            return false;
        }
        true
    }
}
