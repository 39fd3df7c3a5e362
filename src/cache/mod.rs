//! Caching subsystem.
//!
//! # Data Flow
//! ```text
//! Read-heavy lookup:
//!     → CacheBackend::get (miss is a normal outcome, never an error)
//!         → ttl.rs (in-process map, shared/exclusive lock, sweep task)
//!         → store_backed.rs (external store behind the circuit breaker)
//! ```
//!
//! # Design Decisions
//! - One periodic full scan instead of per-entry timers: one lock burst per interval
//! - Expired entries read as absent even before they are swept
//! - Stopping the sweeper never disables synchronous get/set/delete

pub mod store_backed;
pub mod ttl;

use std::time::Duration;

use async_trait::async_trait;

pub use store_backed::StoreCache;
pub use ttl::TtlCache;

/// String cache interface shared by the in-process and store-backed caches.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String, ttl: Duration);

    async fn delete(&self, key: &str);
}

#[async_trait]
impl CacheBackend for TtlCache<String> {
    async fn get(&self, key: &str) -> Option<String> {
        TtlCache::get(self, key)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        TtlCache::set(self, key, value, ttl)
    }

    async fn delete(&self, key: &str) {
        TtlCache::delete(self, key)
    }
}
