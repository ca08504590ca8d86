//! # Analytics Route Handlers
//!
//! Admin-only usage aggregates over the query audit trail.

use super::{require_admin, resolve_user, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::auth::middleware::ResolvedIdentity;
use asknova::{
    queries::{self, UsageStats},
    types::Department,
};
use axum::{
    extract::{Query, State},
    Json,
};
use core_access::NewUserDefaults;
use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct UsageParams {
    pub department: Option<Department>,
}

/// Totals by response source, average processing latency, top intents,
/// feedback sentiment counts, and the escalation rate.
pub async fn usage_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Query(params): Query<UsageParams>,
) -> Result<Json<ApiResponse<UsageStats>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    require_admin(&user)?;

    let stats = queries::usage_stats(&app_state.sqlite_provider.db, params.department).await?;
    Ok(wrap_response(stats, debug_params, None))
}
