//! Cache over the external store, guarded by a circuit breaker.
//!
//! A store failure or an open breaker on `get` is a cache miss; failures on
//! `set`/`delete` are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheBackend;
use crate::resilience::{BreakerError, CircuitBreaker};
use crate::store::{Store, StoreError};

pub struct StoreCache {
    store: Arc<dyn Store>,
    breaker: Arc<CircuitBreaker>,
}

impl StoreCache {
    pub fn new(store: Arc<dyn Store>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { store, breaker }
    }
}

fn log_failure(op: &'static str, key: &str, err: &BreakerError<StoreError>) {
    match err {
        BreakerError::Open => tracing::debug!(op, key, "Store breaker open, skipping cache call"),
        other => tracing::warn!(op, key, error = %other, "Cache store call failed"),
    }
}

#[async_trait]
impl CacheBackend for StoreCache {
    async fn get(&self, key: &str) -> Option<String> {
        match self.breaker.execute(|| self.store.get(key)).await {
            Ok(value) => value,
            Err(e) => {
                log_failure("get", key, &e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        if let Err(e) = self.breaker.execute(|| self.store.set(key, &value, ttl)).await {
            log_failure("set", key, &e);
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.breaker.execute(|| self.store.delete(key)).await {
            log_failure("delete", key, &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_through_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let breaker = Arc::new(CircuitBreaker::new("store", 3, Duration::from_secs(30)));
        let cache = StoreCache::new(store, breaker);

        cache.set("user:1", "alice".to_string(), Duration::from_secs(5)).await;
        assert_eq!(cache.get("user:1").await.as_deref(), Some("alice"));

        cache.delete("user:1").await;
        assert_eq!(cache.get("user:1").await, None);
    }
}
