//! Note Service
//!
//! The write orchestrator and the cached read paths for notes.
//!
//! Every mutation runs inside one transaction so that the ledger append
//! and the note-row change commit or roll back as a unit, and cache
//! invalidation fires only after a successful commit. A transaction
//! dropped on an error path rolls back automatically, so no partial
//! ledger or note state is ever observable.
//!
//! Concurrent writers are arbitrated by the version predicate on the
//! conditional update: of two updates starting from the same observed
//! version, exactly one commits; the other gets
//! `ConcurrentModification` and is expected to re-read and resubmit.

use quill_core::{Note, NoteId, NoteVersion, NoteWithGrants, Permission, UserId};
use quill_storage::CacheKey;

use crate::cache::CacheLayer;
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// VALIDATION GUARDS
// ============================================================================

/// Reject blank values for a required text field.
///
/// The excluded validation layer guards request shape upstream, but the
/// core defends its own invariants independently.
fn require_text<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ApiError::missing_field(field));
    }
    Ok(value)
}

// ============================================================================
// WRITE PATHS
// ============================================================================

/// Create a note at version 1 and seed its version-1 ledger snapshot.
pub async fn create_note(
    db: &DbClient,
    cache: &CacheLayer,
    owner: UserId,
    title: &str,
    content: &str,
) -> ApiResult<Note> {
    let title = require_text("title", title)?;
    let content = require_text("content", content)?;

    let mut conn = db.conn().await?;
    let tx = conn.transaction().await?;

    let note = db
        .note_insert_tx(&tx, NoteId::now_v7(), owner, title, content)
        .await?;
    db.version_append_tx(&tx, note.note_id, &note.title, &note.content, note.version)
        .await?;

    tx.commit().await?;

    cache.invalidate(&CacheKey::OwnerNotes(owner)).await;

    tracing::info!(note_id = %note.note_id, owner = %owner, "Created note");
    Ok(note)
}

/// Update a note's title and content, bumping its version by one.
///
/// The transaction sequences: read current state, append the pre-update
/// snapshot to the ledger, then the conditional update whose version
/// predicate converts a lost race into `ConcurrentModification` instead
/// of a silent overwrite.
pub async fn update_note(
    db: &DbClient,
    cache: &CacheLayer,
    id: NoteId,
    requester: UserId,
    title: &str,
    content: &str,
) -> ApiResult<Note> {
    let title = require_text("title", title)?;
    let content = require_text("content", content)?;

    let mut conn = db.conn().await?;
    let tx = conn.transaction().await?;

    let current = db
        .note_current_tx(&tx, id)
        .await?
        .ok_or_else(|| ApiError::note_not_found(id))?;

    // Caller-layer policy: a non-owner needs an edit grant. An invisible
    // note stays indistinguishable from an absent one; a read grantee
    // already sees the note, so the denial hides nothing.
    if current.owner_id != requester {
        match db.share_permission_tx(&tx, id, requester).await? {
            Some(Permission::Edit) => {}
            Some(Permission::Read) => {
                return Err(ApiError::access_denied("Edit permission required"));
            }
            None => return Err(ApiError::note_not_found(id)),
        }
    }

    db.version_append_tx(&tx, id, &current.title, &current.content, current.version)
        .await?;

    let updated = db
        .note_apply_update_tx(&tx, id, current.version, title, content, requester)
        .await?
        .ok_or_else(|| ApiError::concurrent_modification(id))?;

    tx.commit().await?;

    cache
        .invalidate_all([CacheKey::Note(id), CacheKey::OwnerNotes(current.owner_id)])
        .await;

    tracing::info!(
        note_id = %id,
        version = updated.version,
        editor = %requester,
        "Updated note"
    );
    Ok(updated)
}

/// Soft-delete a note.
///
/// A single-row update in its own transaction; the ledger is left
/// frozen at the last edit. Owner-only: a grantee who can see the note
/// is denied, anyone else learns nothing.
pub async fn delete_note(
    db: &DbClient,
    cache: &CacheLayer,
    id: NoteId,
    requester: UserId,
) -> ApiResult<()> {
    let projection = db
        .note_fetch_with_grants(id)
        .await?
        .ok_or_else(|| ApiError::note_not_found(id))?;

    if projection.note.owner_id != requester {
        if projection.visible_to(requester) {
            return Err(ApiError::access_denied("Only the owner can delete a note"));
        }
        return Err(ApiError::note_not_found(id));
    }

    let affected = db.note_soft_delete(id, requester).await?;
    if affected == 0 {
        // Deleted out from under us between the read and the write.
        return Err(ApiError::note_not_found(id));
    }

    cache
        .invalidate_all([CacheKey::Note(id), CacheKey::OwnerNotes(requester)])
        .await;

    tracing::info!(note_id = %id, owner = %requester, "Soft-deleted note");
    Ok(())
}

// ============================================================================
// READ PATHS (cache-aside)
// ============================================================================

/// Load the note projection through the cache.
///
/// Populates `note:{id}` on miss. Two concurrent misses both populate
/// the key; that race is a benign overwrite of equivalent data.
async fn load_projection(
    db: &DbClient,
    cache: &CacheLayer,
    id: NoteId,
) -> ApiResult<NoteWithGrants> {
    let key = CacheKey::Note(id);

    if let Some(projection) = cache.get::<NoteWithGrants>(&key).await {
        return Ok(projection);
    }

    let projection = db
        .note_fetch_with_grants(id)
        .await?
        .ok_or_else(|| ApiError::note_not_found(id))?;
    cache.put(&key, &projection).await;
    Ok(projection)
}

/// Fetch a note visible to the requester.
pub async fn get_note(
    db: &DbClient,
    cache: &CacheLayer,
    id: NoteId,
    requester: UserId,
) -> ApiResult<Note> {
    let projection = load_projection(db, cache, id).await?;
    if !projection.visible_to(requester) {
        return Err(ApiError::note_not_found(id));
    }
    Ok(projection.note)
}

/// List the requester's own notes, newest-updated first.
pub async fn list_notes(db: &DbClient, cache: &CacheLayer, owner: UserId) -> ApiResult<Vec<Note>> {
    let key = CacheKey::OwnerNotes(owner);

    if let Some(notes) = cache.get::<Vec<Note>>(&key).await {
        return Ok(notes);
    }

    let notes = db.note_list_by_owner(owner).await?;
    cache.put(&key, &notes).await;
    Ok(notes)
}

/// Search the requester's own notes, most relevant first.
///
/// An empty keyword is rejected before the store is touched. Results
/// are cached under the short search TTL; the cache is never
/// invalidated for this key class, so staleness is bounded by TTL
/// alone.
pub async fn search_notes(
    db: &DbClient,
    cache: &CacheLayer,
    owner: UserId,
    keyword: &str,
) -> ApiResult<Vec<Note>> {
    if keyword.trim().is_empty() {
        return Err(ApiError::validation_failed("Search keyword is required"));
    }

    let key = CacheKey::Search {
        user_id: owner,
        keyword: keyword.to_string(),
    };

    if let Some(notes) = cache.get::<Vec<Note>>(&key).await {
        return Ok(notes);
    }

    let notes = db.note_search(owner, keyword).await?;
    cache.put(&key, &notes).await;
    Ok(notes)
}

/// List a note's version history, version-ascending.
///
/// Visible under the same rule as `get`; the ledger itself is not
/// cached.
pub async fn list_versions(
    db: &DbClient,
    cache: &CacheLayer,
    id: NoteId,
    requester: UserId,
) -> ApiResult<Vec<NoteVersion>> {
    let projection = load_projection(db, cache, id).await?;
    if !projection.visible_to(requester) {
        return Err(ApiError::note_not_found(id));
    }
    db.version_list(id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_require_text_rejects_blank() {
        let err = require_text("title", "   ").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("title"));

        let err = require_text("content", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
    }

    #[test]
    fn test_require_text_passes_value_through() -> ApiResult<()> {
        assert_eq!(require_text("title", "  hello ")?, "  hello ");
        Ok(())
    }
}
