//! External key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! StoreRateLimiter / StoreCache
//!     → CircuitBreaker (fail fast while the store is down)
//!     → Store trait
//!         → memory.rs (in-process, single instance, tests)
//!         → redis.rs (shared across instances)
//! ```
//!
//! # Design Decisions
//! - Narrow interface: get/set/delete/incr/expire/ttl, nothing else
//! - A missing key is `Ok(None)`, never an error
//! - Callers decide fail-open vs. fail-closed; the store only reports

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Errors returned by a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other Redis failure. Connection-class errors become `Unavailable`.
    #[error("redis error: {0}")]
    Redis(::redis::RedisError),

    /// The store answered but refused the command.
    #[error("store error: {0}")]
    Backend(String),
}

/// Remote key-value service used behind the breaker, limiter and cache.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increment, creating the key at 1 if absent.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remaining time to live. `None` if the key is absent or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}
