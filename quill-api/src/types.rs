//! Request/response DTOs for the REST surface.
//!
//! The HTTP layer maps 1:1 onto the core operations, so responses are
//! the core entities themselves ([`quill_core::Note`],
//! [`quill_core::NoteVersion`], [`quill_core::SharedNote`]); only the
//! request shapes live here.

use quill_core::{NoteId, Permission, UserId};
use serde::{Deserialize, Serialize};

/// Request to create a new note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
pub struct CreateNoteRequest {
    /// Title of the note (required non-empty)
    pub title: String,
    /// Content of the note (required non-empty)
    pub content: String,
}

/// Request to update an existing note.
///
/// Both fields are required: an update replaces the note's state and
/// produces the next version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    /// New title (required non-empty)
    pub title: String,
    /// New content (required non-empty)
    pub content: String,
}

/// Query parameters for note search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::IntoParams)]
pub struct SearchParams {
    /// Search keyword
    pub q: String,
}

/// Request to share a note with another user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
pub struct ShareNoteRequest {
    /// Note to share
    #[schema(value_type = String, format = "uuid")]
    pub note_id: NoteId,
    /// User the note is shared with
    #[schema(value_type = String, format = "uuid")]
    pub grantee_id: UserId,
    /// Permission level granted
    pub permission: Permission,
}

/// Response confirming a share grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
pub struct ShareResponse {
    #[schema(value_type = String, format = "uuid")]
    pub note_id: NoteId,
    #[schema(value_type = String, format = "uuid")]
    pub grantee_id: UserId,
    pub permission: Permission,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_share_request_deserializes_lowercase_permission() -> Result<(), serde_json::Error> {
        let json = format!(
            r#"{{"note_id": "{}", "grantee_id": "{}", "permission": "edit"}}"#,
            Uuid::nil(),
            Uuid::nil()
        );
        let req: ShareNoteRequest = serde_json::from_str(&json)?;
        assert_eq!(req.permission, Permission::Edit);
        Ok(())
    }

    #[test]
    fn test_create_request_shape() -> Result<(), serde_json::Error> {
        let req: CreateNoteRequest =
            serde_json::from_str(r#"{"title": "A", "content": "B"}"#)?;
        assert_eq!(req.title, "A");
        assert_eq!(req.content, "B");
        Ok(())
    }
}
