//! Boundary Authentication
//!
//! The core trusts an already-verified requester ID; everything about
//! account management and token issuance lives in an external auth
//! service. What remains here is the thin seam: validate the `Bearer`
//! JWT on each request and inject an [`AuthContext`] carrying the
//! requester's user ID into the request extensions.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use quill_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the token-issuing service.
    pub jwt_secret: String,
}

impl AuthConfig {
    /// Load from `QUILL_JWT_SECRET`.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("QUILL_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("QUILL_JWT_SECRET not set, using insecure development secret");
            "insecure-dev-secret".to_string()
        });
        Self { jwt_secret }
    }
}

// ============================================================================
// CLAIMS AND CONTEXT
// ============================================================================

/// JWT claims as issued by the external auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the requester's user ID.
    pub sub: Uuid,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
}

/// The authenticated requester, injected before any core operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
}

// ============================================================================
// TOKEN VALIDATION
// ============================================================================

/// Validate a bearer token and produce the requester context.
pub fn validate_token(token: &str, config: &AuthConfig) -> ApiResult<AuthContext> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::token_expired(),
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(AuthContext {
        user_id: UserId::new(data.claims.sub),
    })
}

/// Mint a token for `user_id`.
///
/// Issuance belongs to the external auth service; this helper exists
/// for tests and local tooling only.
pub fn encode_token(user_id: UserId, secret: &str, ttl_secs: i64) -> ApiResult<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.as_uuid(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal_error(format!("Failed to encode token: {}", e)))
}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Middleware validating the `Authorization: Bearer` header and
/// injecting [`AuthContext`] into request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Expected Bearer token"))?;

    let context = validate_token(token, &state.auth)?;
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Extractor pulling the [`AuthContext`] the middleware injected.
#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
