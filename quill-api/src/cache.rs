//! Cache-Aside Layer
//!
//! Typed read-through helpers over a [`CacheBackend`], applying the
//! failure policy the cache contract demands: the cache is a disposable
//! projection, so no cache failure may ever fail a request.
//!
//! - A read error (or corrupt payload) is logged and treated as a miss,
//!   falling through to the authoritative store.
//! - A populate or invalidate error is logged and dropped; staleness
//!   stays bounded by the key's TTL.
//!
//! The layer never invalidates on read; it populates on miss and
//! invalidates only when a caller reports a committed write.

use quill_storage::{CacheBackend, CacheKey, CacheStats, LmdbCacheBackend, MemoryCacheBackend};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which cache backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Process-local map; empty after every restart.
    Memory,
    /// LMDB on disk; survives restarts.
    Lmdb,
}

/// Cache backend configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    /// LMDB directory (ignored for the memory backend).
    pub path: PathBuf,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Lmdb,
            path: PathBuf::from("./data/quill-cache"),
            max_size_mb: 256,
        }
    }
}

impl CacheSettings {
    /// Load from `QUILL_CACHE_*` environment variables.
    pub fn from_env() -> Self {
        let backend = match std::env::var("QUILL_CACHE_BACKEND").as_deref() {
            Ok("memory") => CacheBackendKind::Memory,
            _ => CacheBackendKind::Lmdb,
        };
        let path = std::env::var("QUILL_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/quill-cache"));
        let max_size_mb = std::env::var("QUILL_CACHE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256);
        Self {
            backend,
            path,
            max_size_mb,
        }
    }

    /// Construct the configured backend.
    pub fn build(&self) -> ApiResult<Arc<dyn CacheBackend>> {
        match self.backend {
            CacheBackendKind::Memory => Ok(Arc::new(MemoryCacheBackend::new())),
            CacheBackendKind::Lmdb => {
                let backend = LmdbCacheBackend::new(&self.path, self.max_size_mb)
                    .map_err(|e| {
                        ApiError::service_unavailable(format!("Failed to open cache: {}", e))
                    })?;
                Ok(Arc::new(backend))
            }
        }
    }
}

/// Cache facade shared by the services.
#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
}

impl CacheLayer {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Fetch and decode the value cached under `key`.
    ///
    /// Returns `None` on miss, on backend failure, and on a payload that
    /// no longer decodes as `T` (stale shape after a deploy) - all three
    /// fall through to the authoritative store.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(payload)) => match serde_json::from_value(payload) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache payload");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Populate `key` with `value` under the key's TTL policy.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode cache payload");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, payload, key.ttl()).await {
            tracing::warn!(key = %key, error = %e, "Cache populate failed");
        }
    }

    /// Invalidate a single key after a committed write.
    ///
    /// Idempotent and best-effort: a failure here never turns a
    /// successful write into a reported failure.
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.backend.invalidate(key).await {
            tracing::error!(key = %key, error = %e, "Post-commit cache invalidation failed");
        }
    }

    /// Invalidate every key affected by a committed write.
    pub async fn invalidate_all(&self, keys: impl IntoIterator<Item = CacheKey>) {
        for key in keys {
            self.invalidate(&key).await;
        }
    }

    /// Backend usage counters.
    pub async fn stats(&self) -> Option<CacheStats> {
        self.backend.stats().await.ok()
    }
}
