//! # Shared Pipeline Types
//!
//! Data shapes used across the query resolution pipeline: the department and
//! response-source tags, the persisted query and feedback records, and the
//! request/reply pair the composer operates on.

use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of departments a user or FAQ entry can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    #[default]
    General,
    Sales,
    Purchase,
    Inventory,
    Production,
    Finance,
    Gst,
    Admin,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::General => "general",
            Department::Sales => "sales",
            Department::Purchase => "purchase",
            Department::Inventory => "inventory",
            Department::Production => "production",
            Department::Finance => "finance",
            Department::Gst => "gst",
            Department::Admin => "admin",
        }
    }

    /// Lenient parse for values read back from storage; anything unknown
    /// collapses to `General`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "sales" => Department::Sales,
            "purchase" => Department::Purchase,
            "inventory" => Department::Inventory,
            "production" => Department::Production,
            "finance" => Department::Finance,
            "gst" => Department::Gst,
            "admin" => Department::Admin,
            _ => Department::General,
        }
    }
}

/// Which resolution path produced a query's stored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Faq,
    Erp,
    Ai,
    Human,
    Pending,
    Error,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Faq => "faq",
            ResponseSource::Erp => "erp",
            ResponseSource::Ai => "ai",
            ResponseSource::Human => "human",
            ResponseSource::Pending => "pending",
            ResponseSource::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "faq" => ResponseSource::Faq,
            "erp" => ResponseSource::Erp,
            "ai" => ResponseSource::Ai,
            "human" => ResponseSource::Human,
            "error" => ResponseSource::Error,
            _ => ResponseSource::Pending,
        }
    }

    /// Whether this tag represents a finished resolution. Only terminal
    /// queries accept feedback or escalation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseSource::Pending)
    }
}

/// One persisted row of the query audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub prompt: String,
    pub response: String,
    pub response_source: ResponseSource,
    pub department: Department,
    pub user_role: String,
    pub intent: Option<Intent>,
    pub processing_ms: Option<i64>,
    pub escalated: bool,
    pub ticket_id: Option<String>,
    /// Free-form JSON blob recording how the response was resolved
    /// (matched FAQ id and confidence, ERP module, and so on).
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// One persisted feedback row, attached to a query after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub query_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub sentiment: String,
    pub created_at: DateTime<Utc>,
}

/// The composer's input: one user question plus routing hints.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Optional parameters forwarded to an ERP integration when that path
    /// is taken.
    #[serde(default)]
    pub parameters: Option<serde_json::Map<String, Value>>,
}

/// The composer's output, ready for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedReply {
    pub query_id: String,
    pub response: String,
    pub source: ResponseSource,
    pub intent: Intent,
    /// The channel-shaped rendering of `response` for the requesting
    /// platform.
    pub formatted: Value,
}
