//! In-process TTL cache with a background sweep task.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

type Entries<V> = RwLock<HashMap<String, CacheEntry<V>>>;

struct Sweeper {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Key/value cache where every entry carries its own TTL.
///
/// Reads take the shared lock; writes and sweeps take the exclusive lock.
/// An expired entry is reported as absent even before the sweeper removes it.
pub struct TtlCache<V> {
    entries: Arc<Entries<V>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache and spawn its sweeper on the current Tokio runtime.
    ///
    /// # Panics
    /// If `sweep_interval` is zero, or when called outside a Tokio runtime.
    pub fn new(sweep_interval: Duration) -> Self {
        assert!(!sweep_interval.is_zero(), "cache sweep interval must be non-zero");

        let entries: Arc<Entries<V>> = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(sweep_loop(
            Arc::downgrade(&entries),
            sweep_interval,
            shutdown.subscribe(),
        ));

        Self {
            entries,
            sweeper: Mutex::new(Some(Sweeper { shutdown, handle })),
        }
    }

    /// Create a cache with no background sweeper; call [`purge_expired`](Self::purge_expired) yourself.
    pub fn without_sweeper() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweeper: Mutex::new(None),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| Instant::now() <= e.expires_at)
            .map(|e| e.value.clone())
    }

    /// Insert or overwrite; last writer wins.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Physical entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Run one sweep now. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Whether the background sweeper is still attached.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Stop the background sweeper and wait for it to exit.
    ///
    /// The cache stays usable; only background eviction stops. Idempotent.
    pub async fn stop_sweeper(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown.trigger();
            if let Err(e) = sweeper.handle.await {
                tracing::error!(error = %e, "Cache sweeper task failed");
            }
        }
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.shutdown.trigger();
        }
    }
}

fn purge<V>(entries: &Entries<V>) -> usize {
    let now = Instant::now();
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|_, e| now <= e.expires_at);
    let removed = before - entries.len();
    let remaining = entries.len();
    drop(entries);

    if removed > 0 {
        tracing::debug!(expired_entries_removed = removed, remaining_entries = remaining, "Cache sweep completed");
        metrics::record_cache_evictions(removed);
    }
    metrics::record_cache_size(remaining);
    removed
}

async fn sweep_loop<V>(entries: Weak<Entries<V>>, interval: Duration, mut shutdown: ShutdownSignal) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                purge(&entries);
            }
            _ = shutdown.recv() => {
                tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
