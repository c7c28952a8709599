//! Opaque TTL key/value cache.
//!
//! Entries are JSON values with a per-entry expiry computed from the
//! injected clock; the moka backend provides capacity-bounded storage and a
//! coarse backstop TTL. Every operation is fail-open: a cache problem is a
//! log line, never an aggregation failure.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::clock::Clock;
use crate::config::CACHE_VERSION;

/// Maximum number of live entries.
const MAX_ENTRIES: u64 = 10_000;
/// Backstop eviction for entries whose logical TTL was never observed.
const BACKSTOP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
struct StoredEntry {
    value: Arc<Value>,
    expires_at_millis: i64,
}

/// TTL key/value store shared across the service.
#[derive(Clone)]
pub struct Cache {
    inner: moka::future::Cache<String, StoredEntry>,
    clock: Arc<dyn Clock>,
}

impl Cache {
    /// Creates an empty cache reading expiry from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(BACKSTOP_TTL)
                .build(),
            clock,
        }
    }

    /// Cache key for the merged bundle of an IP.
    pub fn merged_key(ip: &str) -> String {
        format!("{CACHE_VERSION}:merged:{ip}")
    }

    /// Cache key for the LLM analysis of an IP.
    pub fn ai_key(ip: &str) -> String {
        format!("{CACHE_VERSION}:ai:analysis:{ip}")
    }

    /// Fetches and deserializes an entry; `None` on miss, expiry, or any
    /// decode problem.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.inner.get(key).await?;
        if self.clock.now_millis() >= entry.expires_at_millis {
            self.inner.invalidate(key).await;
            return None;
        }
        match serde_json::from_value(entry.value.as_ref().clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("cache entry {key} failed to decode, dropping: {e}");
                self.inner.invalidate(key).await;
                None
            }
        }
    }

    /// Serializes and stores an entry under `key` for `ttl`.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("cache entry {key} failed to encode, skipping write: {e}");
                return;
            }
        };
        let entry = StoredEntry {
            value: Arc::new(value),
            expires_at_millis: self.clock.now_millis() + ttl.as_millis() as i64,
        };
        self.inner.insert(key.to_string(), entry).await;
    }

    /// Removes an entry.
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Approximate live-entry count, for health reporting.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
