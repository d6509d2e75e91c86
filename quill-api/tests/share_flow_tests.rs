//! Integration tests for the share registry.
//!
//! Covers grant upsert semantics, grantee resolution, the
//! shared-with-me join against live notes, and the caller-layer
//! permission policy on the mutate path.
//!
//! DB-backed tests require `DB_TESTS=1` and a reachable PostgreSQL.

use quill_api::services::{note_service, share_service};
use quill_api::{ErrorCode, PgIdentityResolver};
use quill_core::{Permission, UserId};

#[path = "support/db.rs"]
mod test_db_support;
use test_db_support::{db_test_context, fresh_cache, test_user};

#[tokio::test]
async fn test_re_sharing_updates_permission_in_place() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let grantee = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "shared", "text")
        .await
        .expect("create");

    let first = share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        owner,
        note.note_id,
        grantee,
        Permission::Read,
    )
    .await
    .expect("share read");
    assert_eq!(first.permission, Permission::Read);

    let second = share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        owner,
        note.note_id,
        grantee,
        Permission::Edit,
    )
    .await
    .expect("re-share edit");
    assert_eq!(second.permission, Permission::Edit);

    // Exactly one grant row survives, holding the upgraded permission.
    let shared = share_service::list_shared_with(&ctx.db, &fresh_cache(), grantee)
        .await
        .expect("shared list");
    let grants: Vec<_> = shared
        .iter()
        .filter(|s| s.note.note_id == note.note_id)
        .collect();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].permission, Permission::Edit);
}

#[tokio::test]
async fn test_unknown_grantee_is_rejected() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "mine", "text")
        .await
        .expect("create");

    let err = share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        owner,
        note.note_id,
        UserId::now_v7(),
        Permission::Read,
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidGrantee);
}

#[tokio::test]
async fn test_sharing_someone_elses_note_reads_as_not_found() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let interloper = test_user(&ctx.db).await;
    let grantee = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "mine", "text")
        .await
        .expect("create");

    // Foreign ownership and absence are reported identically.
    let err = share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        interloper,
        note.note_id,
        grantee,
        Permission::Edit,
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);
}

#[tokio::test]
async fn test_grantee_can_read_and_edit_per_grant() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let reader = test_user(&ctx.db).await;
    let editor = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "shared", "text")
        .await
        .expect("create");

    for (grantee, permission) in [(reader, Permission::Read), (editor, Permission::Edit)] {
        share_service::share_note(
            &ctx.db,
            &ctx.cache,
            &resolver,
            owner,
            note.note_id,
            grantee,
            permission,
        )
        .await
        .expect("share");
    }

    // Both grantees see the note.
    for grantee in [reader, editor] {
        let fetched = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, grantee)
            .await
            .expect("grantee get");
        assert_eq!(fetched.note_id, note.note_id);
    }

    // A read grantee is denied the mutate path - they already see the
    // note, so the denial hides nothing.
    let err = note_service::update_note(&ctx.db, &fresh_cache(), note.note_id, reader, "x", "y")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccessDenied);

    // An edit grantee goes through and is stamped as last editor.
    let updated =
        note_service::update_note(&ctx.db, &fresh_cache(), note.note_id, editor, "edited", "y")
            .await
            .expect("editor update");
    assert_eq!(updated.version, 2);
    assert_eq!(updated.updated_by, Some(editor));
    assert_eq!(updated.owner_id, owner);
}

#[tokio::test]
async fn test_soft_deleted_note_drops_out_of_shared_view() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let grantee = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "ephemeral", "text")
        .await
        .expect("create");
    share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        owner,
        note.note_id,
        grantee,
        Permission::Read,
    )
    .await
    .expect("share");

    let shared = share_service::list_shared_with(&ctx.db, &fresh_cache(), grantee)
        .await
        .expect("shared list");
    assert!(shared.iter().any(|s| s.note.note_id == note.note_id));

    note_service::delete_note(&ctx.db, &ctx.cache, note.note_id, owner)
        .await
        .expect("delete");

    // The grant row is untouched, but the join against live notes hides
    // the soft-deleted note from the shared view.
    let shared = share_service::list_shared_with(&ctx.db, &fresh_cache(), grantee)
        .await
        .expect("shared list after delete");
    assert!(shared.iter().all(|s| s.note.note_id != note.note_id));

    // And the grantee's direct read conflates it with absence.
    let err = note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, grantee)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoteNotFound);
}

#[tokio::test]
async fn test_grantee_cannot_delete_a_visible_note() {
    let Some(ctx) = db_test_context().await else {
        return;
    };
    let owner = test_user(&ctx.db).await;
    let grantee = test_user(&ctx.db).await;
    let resolver = PgIdentityResolver::new(ctx.db.clone());

    let note = note_service::create_note(&ctx.db, &ctx.cache, owner, "keep", "text")
        .await
        .expect("create");
    share_service::share_note(
        &ctx.db,
        &ctx.cache,
        &resolver,
        owner,
        note.note_id,
        grantee,
        Permission::Edit,
    )
    .await
    .expect("share");

    let err = note_service::delete_note(&ctx.db, &fresh_cache(), note.note_id, grantee)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccessDenied);

    // Still visible to everyone involved.
    note_service::get_note(&ctx.db, &fresh_cache(), note.note_id, owner)
        .await
        .expect("owner still sees it");
}
