//! Fixed-window rate limiting per client identity.
//!
//! Each client gets one counter per window, keyed `"{client}:{window}"` where
//! `window = floor(now / window_secs)`. Old keys are never reused; they are
//! left to expire in the store.
//!
//! The check is get-then-put, not an atomic increment. Concurrent requests
//! for the same key can read the same count and both be admitted, so the
//! limit is "about `max_requests` per window". Counts never go down and
//! never overshoot what was actually written.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::RateLimitConfig;
use crate::store::{StoreResult, WindowCounterStore};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `count` is the stored count after this request.
    Admitted { key: String, count: u64 },
    /// Rejected; the window already holds `count >= max` requests.
    Limited { key: String, count: u64 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }
}

/// Index of the window containing `now_secs`.
pub fn window_index(now_secs: u64, window_secs: u64) -> u64 {
    now_secs / window_secs.max(1)
}

/// Store key for `client` in the window containing `now_secs`.
pub fn window_key(client: &str, now_secs: u64, window_secs: u64) -> String {
    format!("{}:{}", client, window_index(now_secs, window_secs))
}

/// Seconds since the unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Windowed request counter over a shared store.
#[derive(Clone)]
pub struct RateLimiter {
    counters: WindowCounterStore,
    max_requests: u64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(counters: WindowCounterStore, max_requests: u64, window_secs: u64) -> Self {
        Self {
            counters,
            max_requests: max_requests.max(1),
            window_secs: window_secs.max(1),
        }
    }

    pub fn from_config(counters: WindowCounterStore, config: &RateLimitConfig) -> Self {
        Self::new(counters, config.max_requests, config.window_secs)
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Admit or reject `client` at time `now_secs`.
    ///
    /// A rejected request does not touch the counter.
    pub async fn check(&self, client: &str, now_secs: u64) -> StoreResult<Decision> {
        let key = window_key(client, now_secs, self.window_secs);
        let count = self.counters.get(&key).await?.unwrap_or(0);

        if count >= self.max_requests {
            tracing::debug!(client, key = %key, count, max = self.max_requests, "Window full");
            return Ok(Decision::Limited { key, count });
        }

        let count = count + 1;
        self.counters.put(&key, count).await?;
        Ok(Decision::Admitted { key, count })
    }
}
