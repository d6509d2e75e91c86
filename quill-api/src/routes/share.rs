//! Share REST API Routes
//!
//! Axum route handlers for the share registry.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    auth::AuthContext,
    error::{ApiError, ApiResult},
    services::share_service,
    state::AppState,
    types::{ShareNoteRequest, ShareResponse},
};

/// POST /api/v1/shares - Share a note with another user
#[utoipa::path(
    post,
    path = "/api/v1/shares",
    tag = "Shares",
    request_body = ShareNoteRequest,
    responses(
        (status = 201, description = "Note shared", body = ShareResponse),
        (status = 404, description = "Note not found or not owned", body = ApiError),
        (status = 422, description = "Unknown grantee", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn share_note(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(req): Json<ShareNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let share = share_service::share_note(
        &state.db,
        &state.cache,
        state.identity.as_ref(),
        auth.user_id,
        req.note_id,
        req.grantee_id,
        req.permission,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(share)))
}

/// GET /api/v1/shares/with-me - Notes shared with the requester
#[utoipa::path(
    get,
    path = "/api/v1/shares/with-me",
    tag = "Shares",
    responses(
        (status = 200, description = "Shared notes with permissions", body = Vec<quill_core::SharedNote>),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_shared_with_me(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let shared =
        share_service::list_shared_with(&state.db, &state.cache, auth.user_id).await?;
    Ok(Json(shared))
}

/// Create the share routes router.
pub fn create_router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(share_note))
        .route("/with-me", axum::routing::get(list_shared_with_me))
        .with_state(state)
}
