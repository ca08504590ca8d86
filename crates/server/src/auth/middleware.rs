//! # Authentication Middleware
//!
//! This module provides the Axum extractor that resolves the caller's
//! [`Identity`] exactly once at the request boundary:
//!
//! 1. **Valid bearer token**: `Identity::Authenticated` with the token's
//!    subject.
//! 2. **No token**: `Identity::Anonymous`, keyed by the client-supplied
//!    `X-Session-Id` header when present (so an unauthenticated browser keeps
//!    a stable user across requests) or a freshly generated id otherwise.
//! 3. **Invalid/expired token**: the request is rejected with
//!    `401 Unauthorized`.
//!
//! Handlers receive the variant and never reconstruct identity themselves.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use core_access::Identity;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Header carrying a client-generated anonymous session identifier.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Represents the claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token, which we use as the unique user identifier.
    pub sub: String,
    /// The expiration timestamp.
    pub exp: usize,
}

/// An Axum extractor yielding the caller's resolved [`Identity`].
#[derive(Debug, Clone)]
pub struct ResolvedIdentity(pub Identity);

/// A custom rejection type for authentication failures.
pub struct AuthError(StatusCode, String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl FromRequestParts<AppState> for ResolvedIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // The Authorization header is optional; its absence means anonymous.
        let bearer_header =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    warn!("Unexpected error during header extraction: {}", e);
                    AuthError(
                        StatusCode::BAD_REQUEST,
                        "Invalid Authorization header format.".to_string(),
                    )
                })?;

        if let Some(TypedHeader(Authorization(bearer))) = bearer_header {
            debug!("Authorization header found, validating JWT.");
            let jwt_secret =
                std::env::var("JWT_SECRET").unwrap_or_else(|_| "a-secure-secret-key".to_string());

            let token_data = decode::<Claims>(
                bearer.token(),
                &DecodingKey::from_secret(jwt_secret.as_ref()),
                &Validation::default(),
            )
            .map_err(|e| {
                warn!("JWT validation failed: {}", e);
                AuthError(
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token.".to_string(),
                )
            })?;

            return Ok(ResolvedIdentity(Identity::Authenticated(
                token_data.claims.sub,
            )));
        }

        // Anonymous path: prefer the client's stable session id header.
        let anonymous_id = parts
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        debug!("No Authorization header found, resolving anonymous identity.");
        Ok(ResolvedIdentity(Identity::Anonymous(anonymous_id)))
    }
}
