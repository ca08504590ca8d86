//! # Chat Route Handlers
//!
//! The conversational surface: query resolution, feedback, escalation,
//! session close, and per-user history.

use super::{resolve_user, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::auth::middleware::ResolvedIdentity;
use asknova::{
    queries,
    types::{ChatRequest, Department, QueryRecord, ResponseSource},
    Intent,
};
use axum::{
    extract::{Query, State},
    Json,
};
use core_access::{end_session, resolve_session, NewUserDefaults};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

// --- API Payloads ---

#[derive(Deserialize)]
pub struct QueryApiRequest {
    pub prompt: String,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub device_info: Option<String>,
    /// Profile fields applied only when this request creates a new user.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Parameters forwarded to an ERP integration when that path is taken.
    #[serde(default)]
    pub parameters: Option<serde_json::Map<String, Value>>,
}

#[derive(Serialize)]
pub struct QueryApiResponse {
    pub query_id: String,
    pub response: String,
    pub source: ResponseSource,
    pub intent: Intent,
    pub formatted: Value,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub query_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub feedback_id: String,
    pub sentiment: String,
}

#[derive(Deserialize)]
pub struct EscalateRequest {
    pub query_id: String,
}

#[derive(Serialize)]
pub struct EscalateResponse {
    pub ticket_id: String,
}

#[derive(Deserialize)]
pub struct EndSessionRequest {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub duration_secs: i64,
}

#[derive(Deserialize, Default)]
pub struct HistoryParams {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub data: Vec<QueryRecord>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct Pagination {
    pub total: u32,
    pub limit: u32,
    pub skip: u32,
}

// --- Handlers ---

/// The main entry point: resolves identity and session, then runs the query
/// resolution pipeline.
pub async fn query_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<QueryApiRequest>,
) -> Result<Json<ApiResponse<QueryApiResponse>>, AppError> {
    let defaults = NewUserDefaults {
        name: payload.name.clone(),
        email: payload.email.clone(),
        department: payload.department.map(|d| d.as_str().to_string()),
        role: payload.role.clone(),
    };
    let user = resolve_user(&app_state, &identity.0, &defaults).await?;

    let platform = payload.platform.clone().unwrap_or_else(|| "web".to_string());
    let session = resolve_session(
        &app_state.sqlite_provider.db,
        &user,
        &platform,
        payload.device_info.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, session_id = %session.id, "Received chat query");

    let request = ChatRequest {
        prompt: payload.prompt,
        department: payload.department,
        platform: payload.platform,
        parameters: payload.parameters,
    };

    let reply = app_state
        .composer
        .respond(&app_state.sqlite_provider.db, &user, &session, &request)
        .await?;

    let debug_info = json!({
        "user_id": user.id,
        "session_id": session.id,
        "intent": reply.intent,
    });
    Ok(wrap_response(
        QueryApiResponse {
            query_id: reply.query_id,
            response: reply.response,
            source: reply.source,
            intent: reply.intent,
            formatted: reply.formatted,
        },
        debug_params,
        Some(debug_info),
    ))
}

/// Attaches a 1–5 rating (and optional comment) to a resolved query.
pub async fn feedback_handler(
    State(app_state): State<AppState>,
    _identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackResponse>>, AppError> {
    let feedback = queries::attach_feedback(
        &app_state.sqlite_provider.db,
        &payload.query_id,
        payload.rating,
        payload.comment.as_deref(),
    )
    .await?;

    Ok(wrap_response(
        FeedbackResponse {
            feedback_id: feedback.id,
            sentiment: feedback.sentiment,
        },
        debug_params,
        None,
    ))
}

/// Escalates a resolved query to a human agent. Idempotent: repeating the
/// request returns the already-minted ticket.
pub async fn escalate_handler(
    State(app_state): State<AppState>,
    _identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<EscalateRequest>,
) -> Result<Json<ApiResponse<EscalateResponse>>, AppError> {
    let ticket_id = queries::escalate(&app_state.sqlite_provider.db, &payload.query_id).await?;
    Ok(wrap_response(
        EscalateResponse { ticket_id },
        debug_params,
        None,
    ))
}

/// Explicitly closes an active session.
pub async fn end_session_handler(
    State(app_state): State<AppState>,
    _identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Json(payload): Json<EndSessionRequest>,
) -> Result<Json<ApiResponse<EndSessionResponse>>, AppError> {
    let duration_secs =
        end_session(&app_state.sqlite_provider.db, &payload.session_id).await?;
    Ok(wrap_response(
        EndSessionResponse { duration_secs },
        debug_params,
        None,
    ))
}

/// One page of the caller's query history, newest first.
pub async fn history_handler(
    State(app_state): State<AppState>,
    identity: ResolvedIdentity,
    debug_params: Query<DebugParams>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<HistoryResponse>>, AppError> {
    let user = resolve_user(&app_state, &identity.0, &NewUserDefaults::default()).await?;
    let limit = params.limit.unwrap_or(20).min(100);
    let skip = params.skip.unwrap_or(0);

    let (data, total) =
        queries::history(&app_state.sqlite_provider.db, &user.id, limit, skip).await?;

    Ok(wrap_response(
        HistoryResponse {
            data,
            pagination: Pagination { total, limit, skip },
        },
        debug_params,
        None,
    ))
}
