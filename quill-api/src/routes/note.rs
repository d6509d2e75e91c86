//! Note REST API Routes
//!
//! Axum route handlers for note operations. Handlers stay thin: shape
//! guards, then a service call, then a 1:1 serialization of the result.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use quill_core::NoteId;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    error::{ApiError, ApiResult},
    services::note_service,
    state::AppState,
    types::{CreateNoteRequest, SearchParams, UpdateNoteRequest},
};

/// POST /api/v1/notes - Create a new note
#[utoipa::path(
    post,
    path = "/api/v1/notes",
    tag = "Notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = quill_core::Note),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::missing_field("content"));
    }

    let note = note_service::create_note(
        &state.db,
        &state.cache,
        auth.user_id,
        &req.title,
        &req.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /api/v1/notes - List the requester's notes
#[utoipa::path(
    get,
    path = "/api/v1/notes",
    tag = "Notes",
    responses(
        (status = 200, description = "Notes, newest-updated first", body = Vec<quill_core::Note>),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let notes = note_service::list_notes(&state.db, &state.cache, auth.user_id).await?;
    Ok(Json(notes))
}

/// GET /api/v1/notes/search - Search the requester's notes
#[utoipa::path(
    get,
    path = "/api/v1/notes/search",
    tag = "Notes",
    params(SearchParams),
    responses(
        (status = 200, description = "Search results, most relevant first", body = Vec<quill_core::Note>),
        (status = 400, description = "Missing keyword", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_notes(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let notes =
        note_service::search_notes(&state.db, &state.cache, auth.user_id, &params.q).await?;
    Ok(Json(notes))
}

/// GET /api/v1/notes/{id} - Get note by ID
#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note details", body = quill_core::Note),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let note =
        note_service::get_note(&state.db, &state.cache, NoteId::new(id), auth.user_id).await?;
    Ok(Json(note))
}

/// PUT /api/v1/notes/{id} - Update note
#[utoipa::path(
    put,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = quill_core::Note),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 409, description = "Concurrent modification", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::missing_field("content"));
    }

    let note = note_service::update_note(
        &state.db,
        &state.cache,
        NoteId::new(id),
        auth.user_id,
        &req.title,
        &req.content,
    )
    .await?;

    Ok(Json(note))
}

/// DELETE /api/v1/notes/{id} - Soft-delete note
#[utoipa::path(
    delete,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Note deleted successfully"),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    note_service::delete_note(&state.db, &state.cache, NoteId::new(id), auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/notes/{id}/versions - Version history
#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}/versions",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Version history, version-ascending", body = Vec<quill_core::NoteVersion>),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let versions =
        note_service::list_versions(&state.db, &state.cache, NoteId::new(id), auth.user_id)
            .await?;
    Ok(Json(versions))
}

/// Create the note routes router.
pub fn create_router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(create_note))
        .route("/", axum::routing::get(list_notes))
        .route("/search", axum::routing::get(search_notes))
        .route("/:id", axum::routing::get(get_note))
        .route("/:id", axum::routing::put(update_note))
        .route("/:id", axum::routing::delete(delete_note))
        .route("/:id/versions", axum::routing::get(list_versions))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_note_request_validation() {
        let req = CreateNoteRequest {
            title: "  ".to_string(),
            content: "".to_string(),
        };
        assert!(req.title.trim().is_empty());
        assert!(req.content.trim().is_empty());
    }

    #[test]
    fn test_update_note_request_requires_both_fields() {
        // Both fields are mandatory at the type level; deserialization
        // without either must fail.
        let missing_content: Result<UpdateNoteRequest, _> =
            serde_json::from_str(r#"{"title": "only"}"#);
        assert!(missing_content.is_err());
    }

    #[test]
    fn test_search_params_shape() {
        let params: SearchParams = serde_json::from_str(r#"{"q": "meeting"}"#).expect("params");
        assert_eq!(params.q, "meeting");
    }
}
