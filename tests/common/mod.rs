//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use bulwark::store::{MemoryStore, Store, StoreError};
use bulwark::worker::{Job, JobHandler};

/// Store that is always down. Counts how often it was called.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub calls: AtomicU32,
}

impl FailingStore {
    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        self.fail()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
        self.fail()
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        self.fail()
    }
}

/// In-process store that can be switched off and on mid-test.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    down: std::sync::atomic::AtomicBool,
    pub calls: AtomicU32,
}

impl FlakyStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.check()?;
        self.inner.incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check()?;
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.check()?;
        self.inner.ttl(key).await
    }
}

/// Handler that sleeps for `delay` and records every job id it finishes.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub delay: Duration,
    pub started: AtomicUsize,
    seen: Mutex<Vec<Uuid>>,
}

impl RecordingHandler {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn distinct(&self) -> usize {
        self.seen.lock().iter().collect::<HashSet<_>>().len()
    }
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: &Job) {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.seen.lock().push(job.id);
    }
}

/// Poll `cond` every millisecond until it holds, panicking after `limit`.
pub async fn wait_until<F>(limit: Duration, mut cond: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(limit, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
