//! Shared test infrastructure for DB-backed integration tests.
//!
//! Tests that need a live PostgreSQL instance are skipped unless
//! `DB_TESTS=1` is set; connection parameters come from the usual
//! `QUILL_DB_*` environment variables.

use std::sync::Arc;

use quill_api::{CacheLayer, DbClient, DbConfig};
use quill_core::UserId;
use quill_storage::MemoryCacheBackend;

pub struct DbTestContext {
    pub db: DbClient,
    pub cache: CacheLayer,
}

/// Build a DB-backed test context, or `None` when DB tests are disabled.
pub async fn db_test_context() -> Option<DbTestContext> {
    if std::env::var("DB_TESTS").ok().as_deref() != Some("1") {
        return None;
    }

    let db = DbClient::from_config(&DbConfig::from_env()).expect("Failed to create db client");
    db.ensure_schema().await.expect("Failed to apply schema");

    Some(DbTestContext {
        db,
        cache: fresh_cache(),
    })
}

/// An empty in-memory cache, used to emulate a cold cache mid-test.
pub fn fresh_cache() -> CacheLayer {
    CacheLayer::new(Arc::new(MemoryCacheBackend::new()))
}

/// Create a user row and return its ID.
pub async fn test_user(db: &DbClient) -> UserId {
    let id = UserId::now_v7();
    db.user_ensure(id, &format!("{}@test.example", id))
        .await
        .expect("Failed to create test user");
    id
}
