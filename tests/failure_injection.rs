//! Failure injection tests: store outages, cancellation and deadlines.

use std::sync::Arc;
use std::time::Duration;

use bulwark::admission::{RateLimiter, StoreRateLimiter};
use bulwark::cache::{CacheBackend, StoreCache};
use bulwark::config::{Backend, BulwarkConfig};
use bulwark::lifecycle::Shutdown;
use bulwark::resilience::{
    retry_with, BreakerError, CallContext, CircuitBreaker, CircuitState, Interrupted, RetryError, RetryPolicy,
};
use bulwark::store::Store;
use bulwark::worker::JobRegistry;
use bulwark::AppContext;

mod common;

use common::{FailingStore, FlakyStore};

fn breaker(threshold: u32) -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new("store", threshold, Duration::from_secs(30)))
}

#[tokio::test(start_paused = true)]
async fn test_limiter_fails_open_and_breaker_spares_store() {
    let store = Arc::new(FailingStore::default());
    let limiter = StoreRateLimiter::new(store.clone(), breaker(3));

    for _ in 0..10 {
        assert!(limiter.is_allowed("10.0.0.1", 1, Duration::from_secs(60)).await);
    }
    // Three failures trip the breaker; later requests never reach the store.
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_store_limiter_shares_counts() {
    let store = Arc::new(FlakyStore::default());
    let first = StoreRateLimiter::new(store.clone(), breaker(5));
    let second = StoreRateLimiter::new(store.clone(), breaker(5));
    let window = Duration::from_secs(60);

    assert!(first.is_allowed("client", 2, window).await);
    assert!(second.is_allowed("client", 2, window).await);
    assert!(!first.is_allowed("client", 2, window).await);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(second.is_allowed("client", 2, window).await);
}

#[tokio::test(start_paused = true)]
async fn test_store_cache_recovers_after_outage() {
    let store = Arc::new(FlakyStore::default());
    let cb = breaker(2);
    let cache = StoreCache::new(store.clone(), cb.clone());

    cache.set("user:1", "alice".to_string(), Duration::from_secs(300)).await;
    assert_eq!(cache.get("user:1").await.as_deref(), Some("alice"));

    store.set_down(true);
    assert_eq!(cache.get("user:1").await, None);
    assert_eq!(cache.get("user:1").await, None);
    assert_eq!(cb.state().await, CircuitState::Open);

    let calls = store.calls();
    assert_eq!(cache.get("user:1").await, None);
    assert_eq!(store.calls(), calls);

    store.set_down(false);
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(cache.get("user:1").await.as_deref(), Some("alice"));
    assert_eq!(cb.state().await, CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_trial_reopens_breaker() {
    let cb = breaker(1);
    let _ = cb.execute(|| async { Err::<(), _>("down") }).await;
    tokio::time::sleep(Duration::from_secs(31)).await;

    let ctx = CallContext::none().with_timeout(Duration::from_millis(100));
    let result = cb
        .execute_with(&ctx, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, &str>(())
        })
        .await;
    assert!(matches!(result, Err(BreakerError::Interrupted(Interrupted::DeadlineExceeded))));
    assert_eq!(cb.state().await, CircuitState::Open);

    // The failed trial refreshed the cooldown.
    let result = cb.execute(|| async { Ok::<_, &str>(()) }).await;
    assert!(result.unwrap_err().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_closed_call_is_not_a_failure() {
    let cb = breaker(1);
    let shutdown = Shutdown::new();
    shutdown.trigger();
    let ctx = CallContext::none().with_cancel(shutdown.subscribe());

    let result = cb.execute_with(&ctx, || async { Err::<(), _>("never runs") }).await;
    assert!(matches!(result, Err(BreakerError::Interrupted(Interrupted::Cancelled))));
    assert_eq!(cb.state().await, CircuitState::Closed);
    assert_eq!(cb.failure_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_trial_hands_trial_to_next_caller() {
    let cb = breaker(1);
    let _ = cb.execute(|| async { Err::<(), _>("down") }).await;
    tokio::time::sleep(Duration::from_secs(31)).await;

    let abandoned = cb.execute(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, &str>(())
    });
    let _ = tokio::time::timeout(Duration::from_millis(10), abandoned).await;
    assert_eq!(cb.state().await, CircuitState::HalfOpen);

    let result = cb.execute(|| async { Ok::<_, &str>(7) }).await;
    assert_eq!(result.unwrap(), 7);
    assert_eq!(cb.state().await, CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_retry_stops_at_deadline_during_backoff() {
    let policy = RetryPolicy::new(5, Duration::from_secs(1));
    let ctx = CallContext::none().with_timeout(Duration::from_millis(1500));

    let err = retry_with(&policy, &ctx, || async { Err::<(), _>("still down") })
        .await
        .unwrap_err();

    match err {
        RetryError::Interrupted { attempts, reason } => {
            assert_eq!(attempts, 2);
            assert_eq!(reason, Interrupted::DeadlineExceeded);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_context_with_store_outage() {
    let mut config = BulwarkConfig::default();
    config.rate_limit.backend = Backend::Store;
    config.rate_limit.requests = 1;
    config.cache.backend = Backend::Store;
    config.breaker.failure_threshold = 2;
    config.store.url = Some("redis://127.0.0.1/".to_string());

    let store = Arc::new(FailingStore::default());
    let ctx = AppContext::new(config, store.clone() as Arc<dyn Store>, JobRegistry::new()).unwrap();

    // Limiter and cache share one breaker around the store.
    assert!(ctx.admit("10.0.0.1").await);
    assert_eq!(ctx.cache.get("k").await, None);
    assert_eq!(ctx.store_breaker.state().await, CircuitState::Open);

    assert!(ctx.admit("10.0.0.1").await);
    assert_eq!(store.calls(), 2);

    ctx.shutdown().await;
}
