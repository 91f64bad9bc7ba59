//! Integer window counters over a string key-value store.

use std::sync::Arc;
use std::time::Duration;

use crate::store::{KvStore, StoreError, StoreResult};

/// Reads and writes request counts for window keys.
///
/// Every write uses the same fixed TTL, chosen to outlive the longest window
/// so a counter never disappears while its window is still open.
#[derive(Clone)]
pub struct WindowCounterStore {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl WindowCounterStore {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// TTL applied to every counter write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current count for `key`, or `None` if never written or expired.
    pub async fn get(&self, key: &str) -> StoreResult<Option<u64>> {
        match self.kv.get(key).await? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| StoreError::InvalidCounter {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }

    /// Overwrite the count for `key`.
    pub async fn put(&self, key: &str, count: u64) -> StoreResult<()> {
        self.kv.put(key, &count.to_string(), self.ttl).await
    }
}
