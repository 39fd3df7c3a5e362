//! In-process [`Store`] with per-key expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::store::{Store, StoreError};

#[derive(Debug)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Single-instance store. Expired keys are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_slot<'a>(slots: &'a mut HashMap<String, Slot>, key: &str) -> Option<&'a mut Slot> {
        let now = Instant::now();
        if slots.get(key).is_some_and(|s| !s.live(now)) {
            slots.remove(key);
        }
        slots.get_mut(key)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut slots = self.slots.lock();
        Ok(Self::live_slot(&mut slots, key).map(|s| s.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.slots.lock().insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.slots.lock().remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut slots = self.slots.lock();
        match Self::live_slot(&mut slots, key) {
            Some(slot) => {
                let current: i64 = slot
                    .value
                    .parse()
                    .map_err(|_| StoreError::Backend(format!("value at {key} is not an integer")))?;
                let next = current + 1;
                slot.value = next.to_string();
                Ok(next)
            }
            None => {
                slots.insert(
                    key.to_string(),
                    Slot {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut slots = self.slots.lock();
        if let Some(slot) = Self::live_slot(&mut slots, key) {
            slot.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut slots = self.slots.lock();
        let now = Instant::now();
        Ok(Self::live_slot(&mut slots, key)
            .and_then(|s| s.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_expire() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_and_expire() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("n").await.unwrap(), 1);
        assert_eq!(store.incr("n").await.unwrap(), 2);

        assert_eq!(store.ttl("n").await.unwrap(), None);
        store.expire("n", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.ttl("n").await.unwrap(), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.ttl("n").await.unwrap(), None);
        assert_eq!(store.incr("n").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_non_integer() {
        let store = MemoryStore::new();
        store.set("k", "abc", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(store.incr("k").await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::from_secs(60)).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
