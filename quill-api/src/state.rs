//! Shared application state for Axum routers.
//!
//! Every collaborator is constructed once in `main` and injected here;
//! nothing in the crate reaches for a process-wide singleton. Scoped
//! acquisition happens per request: connections come from the pool and
//! return on drop, rolling back any uncommitted transaction.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::cache::CacheLayer;
use crate::db::DbClient;
use crate::identity::IdentityResolver;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Database client (internally a shared pool).
    pub db: DbClient,
    /// Cache-aside layer over the configured backend.
    pub cache: CacheLayer,
    /// Boundary auth configuration.
    pub auth: AuthConfig,
    /// Identity collaborator seam for grantee resolution.
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        db: DbClient,
        cache: CacheLayer,
        auth: AuthConfig,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            db,
            cache,
            auth,
            identity,
        }
    }
}
