//! Cache-aside building blocks.
//!
//! - [`CacheKey`] owns key derivation and per-class TTL policy.
//! - [`CacheBackend`] is the object-safe contract every backend meets:
//!   get-or-miss (never a false positive), unconditional set,
//!   idempotent invalidate.
//! - [`MemoryCacheBackend`] backs tests and single-process deployments;
//!   [`LmdbCacheBackend`] persists across restarts.

mod key;
mod lmdb;
mod memory;
mod traits;

pub use key::CacheKey;
pub use lmdb::{LmdbCacheBackend, LmdbCacheError};
pub use memory::MemoryCacheBackend;
pub use traits::{CacheBackend, CacheStats, StoredEntry};
