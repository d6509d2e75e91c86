//! Cache key derivation and TTL policy.
//!
//! Every cacheable projection has exactly one key class, and every key
//! class has exactly one TTL. Constructing a [`CacheKey`] is the only
//! way to address the cache, so callers cannot invent ad-hoc keys or
//! disagree about TTLs.

use quill_core::{NoteId, UserId};
use std::fmt;
use std::time::Duration;

/// TTL for single-note and owner-list entries.
const TTL_NOTE: Duration = Duration::from_secs(300);

/// TTL for search and shared-with views. Shorter: relevance results are
/// more sensitive to staleness and cheaper to recompute than a full
/// list, and the shared view is never invalidated on soft-delete.
const TTL_VOLATILE: Duration = Duration::from_secs(60);

/// A derived cache key.
///
/// The rendered form is the wire key stored in the backend:
///
/// - `note:{noteId}` - a single note with its share grants
/// - `notes:user:{userId}` - the owner's full note list
/// - `notes:search:{userId}:{keyword}` - one search result set
/// - `notes:shared:{userId}` - notes shared *with* a user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single note projection, keyed by note ID.
    Note(NoteId),
    /// A user's own notes, newest-updated first.
    OwnerNotes(UserId),
    /// A search result set for one (user, keyword) pair.
    Search { user_id: UserId, keyword: String },
    /// Notes shared with a user.
    SharedWith(UserId),
}

impl CacheKey {
    /// Render the wire key.
    pub fn render(&self) -> String {
        match self {
            CacheKey::Note(id) => format!("note:{}", id),
            CacheKey::OwnerNotes(user) => format!("notes:user:{}", user),
            CacheKey::Search { user_id, keyword } => {
                format!("notes:search:{}:{}", user_id, keyword)
            }
            CacheKey::SharedWith(user) => format!("notes:shared:{}", user),
        }
    }

    /// The TTL this key class is cached under.
    pub fn ttl(&self) -> Duration {
        match self {
            CacheKey::Note(_) | CacheKey::OwnerNotes(_) => TTL_NOTE,
            CacheKey::Search { .. } | CacheKey::SharedWith(_) => TTL_VOLATILE,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
