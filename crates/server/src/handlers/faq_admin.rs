//! # FAQ Route Handlers
//!
//! Public FAQ listing plus the admin-only create/update/deactivate surface.
//! Entries are soft-deactivated, never deleted, so FAQ-sourced answers in
//! the query audit trail stay resolvable.

use super::{require_admin, resolve_user, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::auth::middleware::ResolvedIdentity;
use asknova::{
    faq::{self, FaqEntry, FaqUpdate},
    types::Department,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use core_access::NewUserDefaults;
use serde::{Deserialize, Serialize};
use tracing::info;

// --- API Payloads ---

#[derive(Deserialize, Default)]
pub struct FaqListParams {
    pub department: Option<Department>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub department: Department,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Serialize)]
pub struct DeleteFaqResponse {
    pub deactivated: bool,
}

// --- Handlers ---

/// Lists active FAQs, popularity-descending, optionally filtered by
/// department and category.
pub async fn list_faq_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Query(params): Query<FaqListParams>,
) -> Result<Json<ApiResponse<Vec<FaqEntry>>>, AppError> {
    let entries = faq::list_faqs(
        &app_state.sqlite_provider.db,
        params.department,
        params.category.as_deref(),
        false,
    )
    .await?;
    Ok(wrap_response(entries, debug_params, None))
}

/// Creates an FAQ entry (admin only).
pub async fn create_faq_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateFaqRequest>,
) -> Result<Json<ApiResponse<FaqEntry>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    require_admin(&user)?;

    let entry = faq::create_faq(
        &app_state.sqlite_provider.db,
        &payload.question,
        &payload.answer,
        payload.department,
        payload.category.as_deref(),
        &payload.keywords,
    )
    .await?;
    info!(faq_id = %entry.id, "FAQ created");
    Ok(wrap_response(entry, debug_params, None))
}

/// Applies a partial update to an FAQ entry (admin only).
pub async fn update_faq_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Path(id): Path<String>,
    Json(payload): Json<FaqUpdate>,
) -> Result<Json<ApiResponse<FaqEntry>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    require_admin(&user)?;

    let entry = faq::update_faq(&app_state.sqlite_provider.db, &id, &payload).await?;
    Ok(wrap_response(entry, debug_params, None))
}

/// Soft-deactivates an FAQ entry (admin only).
pub async fn delete_faq_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteFaqResponse>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    require_admin(&user)?;

    faq::deactivate_faq(&app_state.sqlite_provider.db, &id).await?;
    info!(faq_id = %id, "FAQ deactivated");
    Ok(wrap_response(
        DeleteFaqResponse { deactivated: true },
        debug_params,
        None,
    ))
}
