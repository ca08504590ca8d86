use asknova::ChatError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_access::CoreAccessError;
use serde_json::json;
use tracing::error;

/// A generic body for failures whose detail must stay server-side.
const GENERIC_UNAVAILABLE: &str = "The service is temporarily unavailable. Please try again later.";

/// A custom error type for the server application.
///
/// Validation, permission, and not-found failures surface their specific,
/// actionable message; upstream and storage failures are logged in full and
/// returned to the caller as a generic "try again later" body.
pub enum AppError {
    /// Errors originating from the query resolution pipeline.
    Chat(ChatError),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::Chat(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<CoreAccessError> for AppError {
    fn from(err: CoreAccessError) -> Self {
        match err {
            CoreAccessError::SessionNotFound(id) => {
                AppError::Chat(ChatError::NotFound(format!("Active session '{id}'")))
            }
            other => AppError::Chat(ChatError::StorageOperationFailed(other.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Chat(err) => {
                error!("ChatError: {:?}", err);
                match err {
                    ChatError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                    ChatError::NotFound(msg) => {
                        (StatusCode::NOT_FOUND, format!("{msg} was not found."))
                    }
                    ChatError::Permission(msg) => (StatusCode::FORBIDDEN, msg),
                    ChatError::Upstream(_)
                    | ChatError::AiRequest(_)
                    | ChatError::AiDeserialization(_)
                    | ChatError::AiApi(_) => {
                        (StatusCode::BAD_GATEWAY, GENERIC_UNAVAILABLE.to_string())
                    }
                    ChatError::StorageConnection(_) | ChatError::StorageOperationFailed(_) => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        GENERIC_UNAVAILABLE.to_string(),
                    ),
                    ChatError::ReqwestClientBuild(_) | ChatError::JsonSerialization(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                    ),
                }
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
