//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a
//! memory-mapped key-value store that survives restarts. Values are
//! JSON-serialized [`StoredEntry`] envelopes; expiry is enforced on
//! read, and expired rows are deleted on the way out.

use std::path::Path;
use std::sync::RwLock as StdRwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use quill_core::{CacheError, QuillResult};

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, StoredEntry};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// LMDB-backed cache.
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Str, Bytes>,
    /// Hit/miss counters.
    stats: StdRwLock<CacheStats>,
}

impl LmdbCacheBackend {
    /// Open (or create) an LMDB cache at `path` with a map size of
    /// `max_size_mb` megabytes.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: StdRwLock::new(CacheStats::default()),
        })
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

    fn read_entry(&self, rendered: &str) -> Result<Option<StoredEntry>, CacheError> {
        let rtxn = self.env.read_txn().map_err(|e| CacheError::ReadFailed {
            key: rendered.to_string(),
            reason: e.to_string(),
        })?;
        let bytes = self
            .db
            .get(&rtxn, rendered)
            .map_err(|e| CacheError::ReadFailed {
                key: rendered.to_string(),
                reason: e.to_string(),
            })?;
        match bytes {
            Some(bytes) => {
                let entry: StoredEntry =
                    serde_json::from_slice(bytes).map_err(|e| CacheError::CorruptPayload {
                        key: rendered.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn delete_entry(&self, rendered: &str) -> Result<(), CacheError> {
        let mut wtxn = self.env.write_txn().map_err(|e| CacheError::InvalidateFailed {
            key: rendered.to_string(),
            reason: e.to_string(),
        })?;
        // heed reports whether the key existed; either way the outcome
        // is the same, so the flag is dropped to keep deletes idempotent.
        self.db
            .delete(&mut wtxn, rendered)
            .map_err(|e| CacheError::InvalidateFailed {
                key: rendered.to_string(),
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(|e| CacheError::InvalidateFailed {
            key: rendered.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &CacheKey) -> QuillResult<Option<serde_json::Value>> {
        let rendered = key.render();
        match self.read_entry(&rendered)? {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                self.record_hit();
                Ok(Some(entry.payload))
            }
            Some(_) => {
                // Expired: drop the row so the map does not accumulate
                // dead entries; a racing set simply wins.
                self.delete_entry(&rendered)?;
                self.record_miss();
                Ok(None)
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> QuillResult<()> {
        let rendered = key.render();
        let entry = StoredEntry::new(payload, ttl);
        let bytes = serde_json::to_vec(&entry).map_err(|e| CacheError::WriteFailed {
            key: rendered.clone(),
            reason: e.to_string(),
        })?;

        let mut wtxn = self.env.write_txn().map_err(|e| CacheError::WriteFailed {
            key: rendered.clone(),
            reason: e.to_string(),
        })?;
        self.db
            .put(&mut wtxn, &rendered, &bytes)
            .map_err(|e| CacheError::WriteFailed {
                key: rendered.clone(),
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(|e| CacheError::WriteFailed {
            key: rendered,
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> QuillResult<()> {
        self.delete_entry(&key.render())?;
        Ok(())
    }

    async fn stats(&self) -> QuillResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(|e| CacheError::BackendUnavailable {
            reason: e.to_string(),
        })?;
        let entry_count = self.db.len(&rtxn).map_err(|e| CacheError::BackendUnavailable {
            reason: e.to_string(),
        })?;
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

    fn test_backend() -> (tempfile::TempDir, LmdbCacheBackend) {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = LmdbCacheBackend::new(dir.path(), 16).expect("lmdb backend");
        (dir, backend)
    }

    #[tokio::test]
    async fn test_round_trip_survives_reopen() -> QuillResult<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = CacheKey::Note(NoteId::now_v7());

        {
            let backend = LmdbCacheBackend::new(dir.path(), 16).expect("lmdb backend");
            backend
                .set(&key, json!({"v": 1}), Duration::from_secs(300))
                .await?;
        }

        let backend = LmdbCacheBackend::new(dir.path(), 16).expect("lmdb backend");
        assert_eq!(backend.get(&key).await?, Some(json!({"v": 1})));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted_on_read() -> QuillResult<()> {
        let (_dir, backend) = test_backend();
        let key = CacheKey::Search {
            user_id: UserId::now_v7(),
            keyword: "stale".to_string(),
        };

        backend.set(&key, json!([]), Duration::ZERO).await?;
        assert_eq!(backend.get(&key).await?, None);

        let stats = backend.stats().await?;
        assert_eq!(stats.entry_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate_twice_is_noop() -> QuillResult<()> {
        let (_dir, backend) = test_backend();
        let key = CacheKey::OwnerNotes(UserId::now_v7());

        backend.set(&key, json!(["n"]), Duration::from_secs(60)).await?;
        backend.invalidate(&key).await?;
        backend.invalidate(&key).await?;
        assert_eq!(backend.get(&key).await?, None);
        Ok(())
    }
}
