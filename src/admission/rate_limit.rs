//! Fixed window rate limiting.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;

/// Admission check shared by the in-memory and store-backed limiters.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` and report whether it fits in the current window.
    async fn is_allowed(&self, key: &str, limit: u32, window: Duration) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

type Entries = DashMap<String, WindowEntry>;

#[derive(Debug)]
struct Pruner {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Per-key fixed window counter held in process memory.
///
/// Each key's check-and-increment runs under that key's shard lock. Keys
/// whose window has ended are only dropped by [`prune`](Self::prune) or by
/// the background task started with [`with_pruning`](Self::with_pruning).
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    entries: Arc<Entries>,
    pruner: Mutex<Option<Pruner>>,
}

impl FixedWindowLimiter {
    /// A limiter with no background pruning.
    pub fn new() -> Self {
        Self::default()
    }

    /// A limiter that drops ended windows every `window`.
    ///
    /// # Panics
    /// If `window` is zero, or when called outside a Tokio runtime.
    pub fn with_pruning(window: Duration) -> Self {
        assert!(!window.is_zero(), "rate limit window must be non-zero");

        let entries: Arc<Entries> = Arc::new(DashMap::new());
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(prune_loop(Arc::downgrade(&entries), window, shutdown.subscribe()));

        Self {
            entries,
            pruner: Mutex::new(Some(Pruner { shutdown, handle })),
        }
    }

    pub fn is_pruning(&self) -> bool {
        self.pruner.lock().is_some()
    }

    /// Stop the background pruner and wait for it to exit. Idempotent.
    pub async fn stop_pruning(&self) {
        let pruner = self.pruner.lock().take();
        if let Some(pruner) = pruner {
            pruner.shutdown.trigger();
            if let Err(e) = pruner.handle.await {
                tracing::error!(error = %e, "Rate limit pruner task failed");
            }
        }
    }

    /// Synchronous form of [`RateLimiter::is_allowed`].
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(WindowEntry { count: 0, window_start: now });

        if entry.count == 0 || now.duration_since(entry.window_start) >= window {
            *entry = WindowEntry { count: 1, window_start: now };
            return true;
        }

        // Rejected requests still count until the window resets.
        entry.count = entry.count.saturating_add(1);
        if entry.count > limit {
            drop(entry);
            tracing::warn!(client = %key, limit, "Rate limit exceeded");
            metrics::record_rate_limited("memory");
            return false;
        }
        true
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose window ended before `now - window`.
    ///
    /// Their next request would start a fresh window anyway.
    pub fn prune(&self, window: Duration) -> usize {
        prune(&self.entries, window)
    }
}

impl Drop for FixedWindowLimiter {
    fn drop(&mut self) {
        if let Some(pruner) = self.pruner.get_mut().take() {
            pruner.shutdown.trigger();
        }
    }
}

fn prune(entries: &Entries, window: Duration) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, e| now.duration_since(e.window_start) < window);
    before.saturating_sub(entries.len())
}

async fn prune_loop(entries: Weak<Entries>, window: Duration, mut shutdown: ShutdownSignal) {
    let mut ticker = time::interval_at(Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let removed = prune(&entries, window);
                if removed > 0 {
                    tracing::debug!(removed, remaining = entries.len(), "Pruned ended rate limit windows");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Rate limit pruner received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn is_allowed(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check(key, limit, window)
    }
}
