//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience primitives. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BulwarkConfig {
    /// Circuit breaker guarding the external store.
    pub breaker: BreakerConfig,

    /// Request admission (fixed window rate limiting).
    pub rate_limit: RateLimitConfig,

    /// Cache settings.
    pub cache: CacheConfig,

    /// Retry-with-backoff defaults.
    pub retry: RetryConfig,

    /// Background worker pool.
    pub workers: WorkerConfig,

    /// External key-value store.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Where a primitive keeps its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process state; single instance only.
    #[default]
    Memory,
    /// Shared external store; safe across instances.
    Store,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Seconds to stay open before allowing a trial call.
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 30,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per key per window.
    pub requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    pub backend: Backend,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_secs: 60,
            backend: Backend::Memory,
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds between sweeps of expired entries.
    pub sweep_interval_secs: u64,

    /// TTL applied when callers do not pass one.
    pub default_ttl_secs: u64,

    pub backend: Backend,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            default_ttl_secs: 300,
            backend: Backend::Memory,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// First backoff pause in milliseconds; doubles after each failure.
    pub initial_delay_ms: u64,

    /// Optional cap on a single pause in milliseconds.
    pub max_delay_ms: Option<u64>,

    /// Add up to 10% random jitter to each pause.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: None,
            jitter: false,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub count: usize,

    /// Bounded queue capacity; jobs beyond it are dropped.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 3,
            queue_capacity: 100,
        }
    }
}

/// External store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis URL (e.g., "redis://127.0.0.1:6379"). `None` uses an in-process store.
    pub url: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
