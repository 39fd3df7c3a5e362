//! Application context owning one instance of every primitive.
//!
//! Built once at startup from a validated [`BulwarkConfig`] and passed by
//! reference (or cloned `Arc`s) to whatever needs it. Tests build a fresh
//! context each time instead of sharing process-wide state.

use std::sync::Arc;
use std::time::Duration;

use crate::admission::{FixedWindowLimiter, RateLimiter, StoreRateLimiter};
use crate::cache::{CacheBackend, StoreCache, TtlCache};
use crate::config::{validate_config, Backend, BulwarkConfig, ConfigError};
use crate::observability::MetricsAggregator;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::store::Store;
use crate::worker::{JobRegistry, WorkerPool};

pub struct AppContext {
    config: BulwarkConfig,
    pub store: Arc<dyn Store>,
    /// Guards every call into `store`.
    pub store_breaker: Arc<CircuitBreaker>,
    pub limiter: Arc<dyn RateLimiter>,
    local_limiter: Option<Arc<FixedWindowLimiter>>,
    pub cache: Arc<dyn CacheBackend>,
    local_cache: Option<Arc<TtlCache<String>>>,
    pub workers: Arc<WorkerPool>,
    pub metrics: Arc<MetricsAggregator>,
    pub retry: RetryPolicy,
}

impl AppContext {
    /// Validate `config` and build every primitive from it.
    ///
    /// Must be called inside a Tokio runtime: the limiter pruner, the cache
    /// sweeper and the workers are spawned here.
    pub fn new(config: BulwarkConfig, store: Arc<dyn Store>, registry: JobRegistry) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let store_breaker = Arc::new(CircuitBreaker::from_config("store", &config.breaker));

        let (limiter, local_limiter): (Arc<dyn RateLimiter>, _) = match config.rate_limit.backend {
            Backend::Memory => {
                let local = Arc::new(FixedWindowLimiter::with_pruning(Duration::from_secs(
                    config.rate_limit.window_secs,
                )));
                (local.clone(), Some(local))
            }
            Backend::Store => (Arc::new(StoreRateLimiter::new(store.clone(), store_breaker.clone())), None),
        };

        let (cache, local_cache): (Arc<dyn CacheBackend>, _) = match config.cache.backend {
            Backend::Memory => {
                let local = Arc::new(TtlCache::new(Duration::from_secs(config.cache.sweep_interval_secs)));
                (local.clone(), Some(local))
            }
            Backend::Store => (Arc::new(StoreCache::new(store.clone(), store_breaker.clone())), None),
        };

        let workers = Arc::new(WorkerPool::from_config(&config.workers, registry));
        let retry = RetryPolicy::from(&config.retry);

        tracing::info!(
            rate_limit_backend = ?config.rate_limit.backend,
            cache_backend = ?config.cache.backend,
            workers = config.workers.count,
            "Application context ready"
        );

        Ok(Self {
            config,
            store,
            store_breaker,
            limiter,
            local_limiter,
            cache,
            local_cache,
            workers,
            metrics: Arc::new(MetricsAggregator::new()),
            retry,
        })
    }

    pub fn config(&self) -> &BulwarkConfig {
        &self.config
    }

    /// Admission check for one client using the configured limit and window.
    pub async fn admit(&self, client: &str) -> bool {
        let rl = &self.config.rate_limit;
        if !rl.enabled {
            return true;
        }
        self.limiter
            .is_allowed(client, rl.requests, Duration::from_secs(rl.window_secs))
            .await
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.default_ttl_secs)
    }

    /// Stop background tasks: the limiter pruner, the cache sweeper, then the worker pool.
    pub async fn shutdown(&self) {
        if let Some(limiter) = &self.local_limiter {
            limiter.stop_pruning().await;
        }
        if let Some(cache) = &self.local_cache {
            cache.stop_sweeper().await;
        }
        let abandoned = self.workers.shutdown().await;
        tracing::info!(abandoned_jobs = abandoned, "Application context stopped");
    }
}
