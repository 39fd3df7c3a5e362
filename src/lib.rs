//! Resilience primitives for services that depend on flaky collaborators.
//!
//! Circuit breaker, fixed window rate limiting, TTL cache, retry with
//! backoff, a bounded worker pool and a per-endpoint metrics aggregator,
//! plus an [`AppContext`] that owns one of each.

// Primitives
pub mod admission;
pub mod cache;
pub mod resilience;
pub mod worker;

// Collaborators
pub mod store;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod context;

pub use config::schema::BulwarkConfig;
pub use context::AppContext;
pub use lifecycle::Shutdown;
