//! Share Service
//!
//! The share registry: grants, upserts, and the shared-with-me view.
//!
//! Grantee resolution goes through the identity collaborator's seam
//! before the transaction opens; the ownership check and the grant
//! upsert then run atomically in one transaction, with the unique
//! (note, grantee) constraint arbitrating concurrent grants for the
//! same pair.

use quill_core::{Permission, NoteId, SharedNote, UserId};
use quill_storage::CacheKey;

use crate::cache::CacheLayer;
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::identity::IdentityResolver;
use crate::types::ShareResponse;

/// Grant (or re-grant) a note to another user.
///
/// Re-sharing an existing (note, grantee) pair overwrites its
/// permission in place - there is never more than one grant row per
/// pair. The note must exist and belong to `owner`; absence and foreign
/// ownership are reported identically.
pub async fn share_note(
    db: &DbClient,
    cache: &CacheLayer,
    identity: &dyn IdentityResolver,
    owner: UserId,
    note_id: NoteId,
    grantee_id: UserId,
    permission: Permission,
) -> ApiResult<ShareResponse> {
    identity
        .find_by_id(grantee_id)
        .await?
        .ok_or_else(|| ApiError::invalid_grantee(grantee_id))?;

    let mut conn = db.conn().await?;
    let tx = conn.transaction().await?;

    db.note_owned_tx(&tx, note_id, owner)
        .await?
        .ok_or_else(|| ApiError::note_not_found(note_id))?;

    let share = db
        .share_upsert_tx(&tx, note_id, grantee_id, permission)
        .await?;

    tx.commit().await?;

    // The grantee's shared view and the note projection (which carries
    // its grants) are both stale now.
    cache
        .invalidate_all([CacheKey::SharedWith(grantee_id), CacheKey::Note(note_id)])
        .await;

    tracing::info!(
        note_id = %note_id,
        grantee = %grantee_id,
        permission = %share.permission,
        "Shared note"
    );

    Ok(ShareResponse {
        note_id: share.note_id,
        grantee_id: share.grantee_id,
        permission: share.permission,
    })
}

/// Notes shared with the requester, each with its granted permission.
///
/// Served cache-aside under the short TTL. The underlying query joins
/// against live notes only, so a note its owner has soft-deleted drops
/// out of this view even while the grant row remains.
pub async fn list_shared_with(
    db: &DbClient,
    cache: &CacheLayer,
    user: UserId,
) -> ApiResult<Vec<SharedNote>> {
    let key = CacheKey::SharedWith(user);

    if let Some(shared) = cache.get::<Vec<SharedNote>>(&key).await {
        return Ok(shared);
    }

    let shared = db.shared_with(user).await?;
    cache.put(&key, &shared).await;
    Ok(shared)
}
