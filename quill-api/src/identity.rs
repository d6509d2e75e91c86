//! Identity Resolution Seam
//!
//! The share registry must not grant to IDs that do not resolve to a
//! known identity. Identity itself is owned by an external collaborator;
//! this trait is its interface boundary, implemented here against the
//! `users` table the collaborator maintains.

use async_trait::async_trait;
use quill_core::UserId;

use crate::db::DbClient;
use crate::error::ApiResult;

/// A resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

/// Resolve user IDs to identities.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Look up an identity; `None` means the ID is unknown.
    async fn find_by_id(&self, id: UserId) -> ApiResult<Option<Identity>>;
}

/// Resolver backed by the identity collaborator's `users` table.
#[derive(Clone)]
pub struct PgIdentityResolver {
    db: DbClient,
}

impl PgIdentityResolver {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityResolver for PgIdentityResolver {
    async fn find_by_id(&self, id: UserId) -> ApiResult<Option<Identity>> {
        Ok(self
            .db
            .user_exists(id)
            .await?
            .then_some(Identity { user_id: id }))
    }
}
