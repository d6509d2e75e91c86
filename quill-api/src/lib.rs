//! Quill API - versioned note store with cache-coherent reads
//!
//! This crate hosts the write orchestrator, the share registry, the
//! cache-aside layer, and the thin Axum REST surface mapping 1:1 onto
//! the core operations. The database is the sole arbiter of
//! serializability; the optimistic version check turns a lost update
//! race into an explicit, retryable failure.

pub mod auth;
pub mod cache;
pub mod db;
pub mod error;
pub mod identity;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

// Re-export commonly used types
pub use auth::{encode_token, validate_token, AuthConfig, AuthContext, Claims};
pub use cache::{CacheBackendKind, CacheLayer, CacheSettings};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use identity::{Identity, IdentityResolver, PgIdentityResolver};
pub use openapi::ApiDoc;
pub use state::AppState;
pub use types::*;

/// Assemble the full API router.
///
/// Every route behind `/api/v1` requires a validated bearer token; the
/// auth middleware injects [`AuthContext`] before any handler runs.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/notes", routes::note::create_router(state.clone()))
        .nest("/shares", routes::share::create_router(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
}
