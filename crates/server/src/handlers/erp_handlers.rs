//! # ERP Route Handlers
//!
//! Lists the integrations visible to the caller's role, registers new
//! descriptors (admin only), and executes one integration directly through
//! the gateway.

use super::{require_admin, resolve_user, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::auth::middleware::ResolvedIdentity;
use asknova::erp::{self, ErpIntegration, ErpParameter};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use core_access::NewUserDefaults;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

// --- API Payloads ---

#[derive(Deserialize)]
pub struct CreateIntegrationRequest {
    pub module: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<ErpParameter>,
    #[serde(default)]
    pub response_mapping: Map<String, Value>,
    #[serde(default)]
    pub access_roles: Vec<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Deserialize, Default)]
pub struct ExecuteIntegrationRequest {
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

// --- Handlers ---

/// Lists active integrations visible to the caller's role.
pub async fn list_integrations_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<ErpIntegration>>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    let integrations =
        erp::list_integrations(&app_state.sqlite_provider.db, Some(&user.role)).await?;
    Ok(wrap_response(integrations, debug_params, None))
}

/// Registers a new integration descriptor (admin only).
pub async fn create_integration_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateIntegrationRequest>,
) -> Result<Json<ApiResponse<ErpIntegration>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    require_admin(&user)?;

    let integration = erp::create_integration(
        &app_state.sqlite_provider.db,
        &payload.module,
        &payload.name,
        payload.description.as_deref(),
        &payload.endpoint,
        &payload.method,
        &payload.parameters,
        &payload.response_mapping,
        &payload.access_roles,
    )
    .await?;
    info!(integration_id = %integration.id, module = %integration.module, "ERP integration registered");
    Ok(wrap_response(integration, debug_params, None))
}

/// Executes one integration directly. The gateway enforces the role
/// allow-list and parameter schema exactly as on the chat path.
pub async fn execute_integration_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Path(id): Path<String>,
    Json(payload): Json<ExecuteIntegrationRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    let integration = erp::get_integration(&app_state.sqlite_provider.db, &id).await?;

    let data = app_state
        .erp_gateway
        .execute(&integration, &payload.parameters, &user.role)
        .await?;
    Ok(wrap_response(data, debug_params, None))
}
