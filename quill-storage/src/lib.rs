//! Quill Storage - cache subsystem
//!
//! Key derivation, TTL policy, and pluggable cache backends for the
//! cache-aside layer in front of the note store. The backends store
//! JSON payloads inside an envelope carrying an expiry deadline, so an
//! expired entry is indistinguishable from an absent one at read time.

pub mod cache;

pub use cache::{
    CacheBackend, CacheKey, CacheStats, LmdbCacheBackend, LmdbCacheError, MemoryCacheBackend,
    StoredEntry,
};
