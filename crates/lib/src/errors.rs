use thiserror::Error;

/// Custom error types for the query resolution pipeline.
///
/// The first five variants form the user-facing taxonomy: validation and
/// permission problems carry actionable messages, while upstream and storage
/// failures are reported generically and logged in detail server-side.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Upstream call failed: {0}")]
    Upstream(String),
    #[error("Storage connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Failed to build HTTP client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to AI provider failed: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("Failed to serialize result: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl From<turso::Error> for ChatError {
    fn from(err: turso::Error) -> Self {
        ChatError::StorageOperationFailed(err.to_string())
    }
}
