//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the
//! `asknova-server`. The handlers are split into logical sub-modules based
//! on their functionality (chat, FAQ administration, ERP, analytics).

pub mod analytics;
pub mod chat;
pub mod erp_handlers;
pub mod faq_admin;
pub mod general;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use analytics::*;
pub use chat::*;
pub use erp_handlers::*;
pub use faq_admin::*;
pub use general::*;

// Shared items used by multiple handler modules.
use super::{
    errors::AppError,
    state::AppState,
    types::{ApiResponse, DebugParams},
};
use asknova::ChatError;
use axum::{extract::Query, Json};
use core_access::{get_or_create_user, Identity, NewUserDefaults, User};
use serde_json::Value;

/// A shared helper function to wrap a successful result in the standard
/// `ApiResponse` format, optionally including debug information if requested.
pub(crate) fn wrap_response<T>(
    result: T,
    debug_params: Query<DebugParams>,
    debug_info: Option<Value>,
) -> Json<ApiResponse<T>> {
    let debug = if debug_params.debug.unwrap_or(false) {
        debug_info
    } else {
        None
    };
    Json(ApiResponse { debug, result })
}

/// Resolves the durable user for a request's identity.
pub(crate) async fn resolve_user(
    state: &AppState,
    identity: &Identity,
    defaults: &NewUserDefaults,
) -> Result<User, AppError> {
    Ok(get_or_create_user(&state.sqlite_provider.db, identity, defaults).await?)
}

/// Guards the administrative surface: FAQ and integration management plus
/// analytics require the `admin` role.
pub(crate) fn require_admin(user: &User) -> Result<(), AppError> {
    if user.role == "admin" {
        Ok(())
    } else {
        Err(AppError::Chat(ChatError::Permission(
            "Admin privileges required".to_string(),
        )))
    }
}
