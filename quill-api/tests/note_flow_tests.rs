//! Integration tests for the versioned note write path.
//!
//! Covers the transactional properties: the create/update/versions
//! round trip, the version ledger's exactly-M-rows shape, optimistic
//! concurrency under racing writers, and soft-delete visibility.
//!
//! DB-backed tests require `DB_TESTS=1` and a reachable PostgreSQL; they
//! pass vacuously otherwise, exactly like the other gated suites.

use std::sync::Arc;

use quill_api::services::note_service;
use quill_api::{DbClient, DbConfig, ErrorCode};
use quill_core::NoteId;
use tokio::sync::Barrier;

#[path = "support/db.rs"]
mod test_db_support;
use test_db_support::{db_test_context, fresh_cache, test_user};

// ============================================================================
// VALIDATION (no database required)
// ============================================================================

#[tokio::test]
async fn test_search_rejects_empty_keyword_before_touching_store() {
    // A client built from the default config never connects unless a
    // query runs; the keyword guard must fire first.
    let db = DbClient::from_config(&DbConfig::default()).expect("db client");
    let cache = fresh_cache();
    let owner = quill_core::UserId::now_v7();

    for keyword in ["", "   "] {
        let err = note_service::search_notes(&db, &cache, owner, keyword)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}

mod keyword_guard_props {
    use super::*;
    use proptest::prelude::*;
    use tokio::runtime::Runtime;

    proptest! {
        /// Any whitespace-only keyword is rejected before the store is
        /// touched, regardless of length or which whitespace it uses.
        #[test]
        fn prop_blank_keywords_always_rejected(keyword in "[ \\t\\n]{0,16}") {
            let rt = Runtime::new().map_err(|e| {
                TestCaseError::fail(format!("Failed to create runtime: {}", e))
            })?;
            let db = DbClient::from_config(&DbConfig::default()).expect("db client");
            let cache = fresh_cache();
            let owner = quill_core::UserId::now_v7();

            let err = rt
                .block_on(note_service::search_notes(&db, &cache, owner, &keyword))
                .unwrap_err();
            prop_assert_eq!(err.code, ErrorCode::ValidationFailed);
        }
    }
}

#[tokio::test]
async fn test_create_rejects_blank_title_and_content() {
    let db = DbClient::from_config(&DbConfig::default()).expect("db client");
    let cache = fresh_cache();
    let owner = quill_core::UserId::now_v7();

    let err = note_service::create_note(&db, &cache, owner, " ", "content")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);

    let err = note_service::create_note(&db, &cache, owner, "title", "")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);
}

// ============================================================================
// ROUND TRIP AND THE VERSION LEDGER
// ============================================================================

#[tokio::test]
async fn test_create_update_versions_round_trip() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "A", "B")
        .await
        .expect("create");
    assert_eq!(note.version, 1);
    assert_eq!(note.updated_by, None);

    let fetched = note_service::get_note(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("get");
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched.title, "A");
    assert_eq!(fetched.content, "B");

    let updated = note_service::update_note(&ctx.db, &ctx.cache, note.note_id, owner, "C", "B")
        .await
        .expect("update");
    assert_eq!(updated.version, 2);
    assert_eq!(updated.title, "C");
    assert_eq!(updated.updated_by, Some(owner));

    let fetched = note_service::get_note(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("get after update");
    assert_eq!(fetched.version, 2);
    assert_eq!(fetched.title, "C");

    // Exactly one ledger entry: the pre-image of the single update.
    let versions = note_service::list_versions(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("versions");
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[0].title, "A");
    assert_eq!(versions[0].content, "B");
}

#[tokio::test]
async fn test_ledger_holds_exactly_m_rows_after_m_updates() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "v1", "first")
        .await
        .expect("create");

    const M: i32 = 5;
    for i in 2..=M + 1 {
        note_service::update_note(
            &ctx.db,
            &ctx.cache,
            note.note_id,
            owner,
            &format!("v{}", i),
            "updated",
        )
        .await
        .expect("update");
    }

    let versions = note_service::list_versions(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("versions");

    assert_eq!(versions.len(), M as usize);
    for (i, snapshot) in versions.iter().enumerate() {
        // Version-ascending, 1..=M, each holding the pre-image title.
        assert_eq!(snapshot.version, i as i32 + 1);
        assert_eq!(snapshot.title, format!("v{}", i + 1));
    }
}

// ============================================================================
// OPTIMISTIC CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_stale_observed_version_loses_exactly_once() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "base", "base")
        .await
        .expect("create");

    // N writers all conditioned on the version they observed at create
    // time: the compare-and-swap admits exactly one.
    let mut successes = 0;
    for i in 0..4 {
        let mut conn = ctx.db.conn().await.expect("conn");
        let tx = conn.transaction().await.expect("tx");
        let applied = ctx
            .db
            .note_apply_update_tx(&tx, note.note_id, 1, &format!("w{}", i), "racing", owner)
            .await
            .expect("conditional update");
        tx.commit().await.expect("commit");
        if applied.is_some() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let current = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, owner)
        .await
        .expect("get");
    assert_eq!(current.version, 2, "version advances by one, not by N");
}

#[tokio::test]
async fn test_racing_service_updates_never_skip_versions() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "base", "base")
        .await
        .expect("create");

    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let mut handles = Vec::with_capacity(WRITERS);

    for i in 0..WRITERS {
        let db = ctx.db.clone();
        let cache = fresh_cache();
        let barrier = barrier.clone();
        let note_id = note.note_id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            note_service::update_note(&db, &cache, note_id, owner, &format!("w{}", i), "racing")
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.code, ErrorCode::ConcurrentModification),
        }
    }
    assert!(successes >= 1);

    // Every committed update advanced the version by exactly one; the
    // losers reported ConcurrentModification instead of overwriting.
    let current = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, owner)
        .await
        .expect("get");
    assert_eq!(current.version, 1 + successes as i32);

    let versions = note_service::list_versions(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("versions");
    assert_eq!(versions.len(), successes);
}

// ============================================================================
// SOFT DELETE AND VISIBILITY
// ============================================================================

#[tokio::test]
async fn test_soft_deleted_note_disappears_from_reads() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "gone", "soon")
        .await
        .expect("create");

    note_service::delete_note(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("delete");

    let err = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, owner)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);

    let notes = note_service::list_notes(&ctx.db, &fresh_cache(), owner)
        .await
        .expect("list");
    assert!(notes.iter().all(|n| n.note_id != note.note_id));
    assert!(notes.iter().all(|n| n.deleted_at.is_none()));

    // Deleting again reports not-found, same as never having existed.
    let err = note_service::delete_note(&ctx.db, &fresh_cache(), note.note_id, owner)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);
}

#[tokio::test]
async fn test_invisible_note_reads_as_not_found() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let stranger = test_user(&ctx.db).await;

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "private", "text")
        .await
        .expect("create");

    // Not-found and not-authorized are deliberately the same signal.
    let err = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, stranger)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);

    let err = note_service::update_note(&ctx.db, &fresh_cache(), note.note_id, stranger, "x", "y")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);

    let err = note_service::get_note(
        &ctx.db,
        &fresh_cache(),
        NoteId::now_v7(),
        owner,
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);
}

#[tokio::test]
async fn test_list_notes_is_newest_updated_first() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;

    let first = note_service::create_note(&ctx.db, &ctx.cache, owner, "first", "x")
        .await
        .expect("create");
    let second = note_service::create_note(&ctx.db, &ctx.cache, owner, "second", "x")
        .await
        .expect("create");

    // Touch the older note so it becomes the most recently updated.
    note_service::update_note(&ctx.db, &ctx.cache, first.note_id, owner, "first!", "x")
        .await
        .expect("update");

    let notes = note_service::list_notes(&ctx.db, &fresh_cache(), owner)
        .await
        .expect("list");
    let positions: Vec<_> = notes.iter().map(|n| n.note_id).collect();
    let first_pos = positions.iter().position(|id| *id == first.note_id);
    let second_pos = positions.iter().position(|id| *id == second.note_id);
    assert!(first_pos < second_pos, "updated note must sort first");
}
