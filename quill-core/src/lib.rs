//! Quill Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic.

mod error;
mod identity;
mod note;

pub use error::{CacheError, QuillError, QuillResult, StorageError, ValidationError};
pub use identity::{new_entity_id, EntityId, NoteId, ShareId, Timestamp, UserId, VersionId};
pub use note::{Note, NoteShare, NoteVersion, NoteWithGrants, Permission, ShareGrant, SharedNote};
