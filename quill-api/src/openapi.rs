//! OpenAPI Specification for the Quill API
//!
//! Generates the OpenAPI document from Rust types and route annotations
//! via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{note, share};
use crate::types::{CreateNoteRequest, ShareNoteRequest, ShareResponse, UpdateNoteRequest};
use quill_core::{Note, NoteShare, NoteVersion, Permission, SharedNote};

/// OpenAPI document for the Quill API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quill API",
        version = "0.3.0",
        description = "Versioned, cache-coherent, multi-tenant note store",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Notes", description = "Note CRUD, search, and version history"),
        (name = "Shares", description = "Note sharing and the shared-with-me view")
    ),
    paths(
        note::create_note,
        note::list_notes,
        note::search_notes,
        note::get_note,
        note::update_note,
        note::delete_note,
        note::list_versions,

        share::share_note,
        share::list_shared_with_me,
    ),
    components(
        schemas(
            Note,
            NoteVersion,
            NoteShare,
            SharedNote,
            Permission,
            CreateNoteRequest,
            UpdateNoteRequest,
            ShareNoteRequest,
            ShareResponse,
            ApiError,
            ErrorCode,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer-token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("serializable document");
        assert!(json.contains("/api/v1/notes"));
        assert!(json.contains("/api/v1/shares"));
        assert!(json.contains("bearer_auth"));
    }
}
