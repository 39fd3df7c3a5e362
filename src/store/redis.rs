//! Redis-backed [`Store`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};

use crate::store::{Store, StoreError};

/// Store shared by every service instance pointed at the same Redis.
///
/// `ConnectionManager` reconnects on its own; each call clones the handle.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the connection with a PING.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let mut manager = ConnectionManager::new(client).await?;
        redis::cmd("PING").query_async::<_, ()>(&mut manager).await?;

        tracing::info!("Redis connected");
        Ok(Self { manager })
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Redis(err)
        }
    }
}

fn millis(ttl: Duration) -> u64 {
    // PX/PEXPIRE reject 0
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        let count = redis::cmd("INCR").arg(key).query_async::<_, i64>(&mut conn).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.manager.clone();
        // -2: no such key, -1: no expiry
        let pttl = redis::cmd("PTTL").arg(key).query_async::<_, i64>(&mut conn).await?;
        Ok(u64::try_from(pttl).ok().map(Duration::from_millis))
    }
}
