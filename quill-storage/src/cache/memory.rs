//! In-memory cache backend.
//!
//! A `HashMap` behind a tokio `RwLock`. Used by tests and by
//! single-process deployments that do not want an on-disk cache.

use std::collections::HashMap;
use std::sync::RwLock as StdRwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use quill_core::QuillResult;
use tokio::sync::RwLock;

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, StoredEntry};

/// Cache backend keeping all entries in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
    stats: StdRwLock<CacheStats>,
}

impl MemoryCacheBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> QuillResult<Option<serde_json::Value>> {
        let rendered = key.render();
        let now = Utc::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&rendered) {
                Some(entry) if !entry.is_expired(now) => {
                    let payload = entry.payload.clone();
                    drop(entries);
                    self.record_hit();
                    return Ok(Some(payload));
                }
                Some(_) => {}
                None => {
                    drop(entries);
                    self.record_miss();
                    return Ok(None);
                }
            }
        }

        // Expired: collect it lazily, re-checking under the write lock in
        // case a concurrent set already replaced it.
        let mut entries = self.entries.write().await;
        if entries
            .get(&rendered)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false)
        {
            entries.remove(&rendered);
        }
        drop(entries);
        self.record_miss();
        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> QuillResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.render(), StoredEntry::new(payload, ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> QuillResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&key.render());
        Ok(())
    }

    async fn stats(&self) -> QuillResult<CacheStats> {
        let entry_count = self.entries.read().await.len() as u64;
        let mut stats = self
            .stats
            .read()
            .map(|s| (*s).clone())
            .unwrap_or_default();
        stats.entry_count = entry_count;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{NoteId, UserId};
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get_round_trip() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::Note(NoteId::now_v7());

        backend
            .set(&key, json!({"title": "a"}), Duration::from_secs(60))
            .await?;
        assert_eq!(backend.get(&key).await?, Some(json!({"title": "a"})));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_key_is_miss() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::OwnerNotes(UserId::now_v7());
        assert_eq!(backend.get(&key).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_collected() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::SharedWith(UserId::now_v7());

        backend.set(&key, json!([1, 2]), Duration::ZERO).await?;
        assert_eq!(backend.get(&key).await?, None);

        // The expired entry was removed, not just hidden.
        let stats = backend.stats().await?;
        assert_eq!(stats.entry_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_overwrites_unconditionally() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::Note(NoteId::now_v7());

        backend.set(&key, json!(1), Duration::from_secs(60)).await?;
        backend.set(&key, json!(2), Duration::from_secs(60)).await?;
        assert_eq!(backend.get(&key).await?, Some(json!(2)));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::Note(NoteId::now_v7());

        backend.set(&key, json!(1), Duration::from_secs(60)).await?;
        backend.invalidate(&key).await?;
        assert_eq!(backend.get(&key).await?, None);

        // Second invalidation of an absent key is a no-op, not an error.
        backend.invalidate(&key).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() -> QuillResult<()> {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::Note(NoteId::now_v7());

        backend.get(&key).await?;
        backend.set(&key, json!(1), Duration::from_secs(60)).await?;
        backend.get(&key).await?;

        let stats = backend.stats().await?;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        Ok(())
    }
}
