//! Cache backend contract and stored-entry envelope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::QuillResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::key::CacheKey;

/// The envelope a backend persists for each key.
///
/// Expiry is enforced at read time: a backend must treat an expired
/// envelope as a miss, never return it. Backends that can cheaply do so
/// also delete the expired row on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The cached JSON payload.
    pub payload: serde_json::Value,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// Deadline after which the entry is a miss.
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Build an envelope expiring `ttl` from now.
    pub fn new(payload: serde_json::Value, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            payload,
            stored_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the envelope has passed its deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Cache backend contract.
///
/// - `get` returns the cached payload or an explicit miss, never a
///   false positive: an expired envelope is a miss.
/// - `set` overwrites unconditionally.
/// - `invalidate` is an unconditional delete and idempotent: deleting a
///   key that is not present is a no-op, not an error.
///
/// Backends are shared behind `Arc<dyn CacheBackend>`; all methods take
/// `&self` and must be safe under concurrent callers. Racing populations
/// of the same key are benign overwrites of equivalent data, so no
/// cross-key coordination is required.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the payload stored under `key`, or `None` on miss/expiry.
    async fn get(&self, key: &CacheKey) -> QuillResult<Option<serde_json::Value>>;

    /// Store `payload` under `key` for `ttl`.
    async fn set(&self, key: &CacheKey, payload: serde_json::Value, ttl: Duration)
        -> QuillResult<()>;

    /// Delete whatever is stored under `key`.
    async fn invalidate(&self, key: &CacheKey) -> QuillResult<()>;

    /// Usage counters.
    async fn stats(&self) -> QuillResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired reads).
    pub misses: u64,
    /// Number of entries currently stored, expired entries included
    /// until they are lazily collected.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
