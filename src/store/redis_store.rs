//! Redis-backed counter store.
//!
//! Counters are plain string keys written with `SET .. EX`, so every gateway
//! instance pointed at the same Redis shares one view of each window.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client as RedisClient;

use crate::store::{KvStore, StoreError, StoreResult};

/// A `KvStore` backed by Redis.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Create a store for `url`. No connection is made until first use.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = RedisClient::open(url).map_err(unavailable)?;
        Ok(Self { client })
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        conn.get(key).await.map_err(unavailable)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let _: () = conn
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
