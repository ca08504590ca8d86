//! # Shared Constants
//!
//! This module provides a centralized location for the tuning knobs of the
//! query resolution pipeline. Every threshold that steers routing decisions
//! lives here, never as a literal at a call site.

/// Minimum FAQ confidence for a match to be considered at all.
pub const FAQ_ROUTING_THRESHOLD: f64 = 0.3;

/// FAQ confidence at or above which the match answers the query outright,
/// with no ERP or generative fallback.
pub const FAQ_DIRECT_THRESHOLD: f64 = 0.75;

/// Multiplier applied to an FAQ's confidence when its owning department
/// matches the requesting department (and that department is not `general`).
pub const FAQ_DEPARTMENT_BOOST: f64 = 1.5;

/// Tokens shorter than this many characters are treated as noise and
/// discarded before scoring.
pub const FAQ_MIN_TOKEN_LEN: usize = 4;

/// How many prior query/response pairs are fed to the generative model as
/// conversation context.
pub const HISTORY_CONTEXT_TURNS: u32 = 5;

/// The response text a query row carries from creation until resolution
/// completes, so clients never observe a null response.
pub const PENDING_RESPONSE: &str = "Processing...";

/// The user-safe message stored and returned when every resolution path has
/// failed. Upstream detail stays in the logs.
pub const FALLBACK_ERROR_RESPONSE: &str =
    "Sorry, I could not process your request right now. Please try again later.";

/// Default bound on a single generative-AI call.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

/// Default bound on a single proxied ERP call.
pub const DEFAULT_ERP_TIMEOUT_SECS: u64 = 15;
