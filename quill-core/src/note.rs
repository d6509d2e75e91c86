//! Core entity structures

use crate::{NoteId, ShareId, Timestamp, UserId, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Note - the mutable current-state record.
///
/// Owned by the note store and mutated only through the write
/// orchestrator. `version` increases by exactly one on every successful
/// mutation; a non-null `deleted_at` hides the note from every read and
/// search path while its history remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Note {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub note_id: NoteId,
    /// Owner of the note.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub owner_id: UserId,
    /// Last editor, if the note has ever been updated.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub updated_by: Option<UserId>,
    pub title: String,
    pub content: String,
    /// Optimistic-concurrency version, starts at 1.
    pub version: i32,
    /// Soft-delete marker.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub deleted_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Note {
    /// Whether the note has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// NoteVersion - an immutable ledger snapshot.
///
/// Holds the (title, content) of a note as of `version`. Records are
/// append-only; they survive soft-deletion of the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NoteVersion {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub version_id: VersionId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
    /// The note's version number at the time this snapshot was current.
    pub version: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Permission level of a share grant.
///
/// Two levels with a strict ordering `Read < Edit`; what `Edit` allows
/// is decided by the caller layer consulting the share registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Edit,
}

impl Permission {
    /// Stable wire/storage spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Edit => "edit",
        }
    }

    /// Parse the storage spelling back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Permission::Read),
            "edit" => Some(Permission::Edit),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NoteShare - a (note, grantee) permission grant.
///
/// At most one row exists per (note, grantee) pair; re-sharing updates
/// the permission in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NoteShare {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub share_id: ShareId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub note_id: NoteId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub grantee_id: UserId,
    pub permission: Permission,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// A single grant as carried inside the cached note projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ShareGrant {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub grantee_id: UserId,
    pub permission: Permission,
}

/// Note projection carrying its share grants.
///
/// This is the unit cached under `note:{id}`: a hit still has everything
/// visibility filtering needs, and a share change invalidates one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteWithGrants {
    pub note: Note,
    pub grants: Vec<ShareGrant>,
}

impl NoteWithGrants {
    /// Permission the requester holds on this note, if any.
    ///
    /// The owner implicitly holds `Edit`; everyone else holds whatever
    /// their grant says.
    pub fn permission_for(&self, requester: UserId) -> Option<Permission> {
        if self.note.owner_id == requester {
            return Some(Permission::Edit);
        }
        self.grants
            .iter()
            .find(|g| g.grantee_id == requester)
            .map(|g| g.permission)
    }

    /// Whether the requester may see this note at all.
    pub fn visible_to(&self, requester: UserId) -> bool {
        self.permission_for(requester).is_some()
    }
}

/// A note paired with the permission it was shared under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SharedNote {
    #[serde(flatten)]
    pub note: Note,
    pub permission: Permission,
}
