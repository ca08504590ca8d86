//! # AskNova Query Resolution Pipeline
//!
//! This crate implements the decision procedure behind the AskNova ERP
//! assistant: an inbound user question is classified by intent, scored
//! against the curated FAQ set, proxied to a registered ERP integration, or
//! answered by a generative completion, in that priority order. Every
//! question leaves a persisted audit record with its resolution path, timing,
//! and later feedback or escalation.

pub mod compose;
pub mod constants;
pub mod erp;
pub mod errors;
pub mod faq;
pub mod intent;
pub mod platform;
pub mod prompts;
pub mod providers;
pub mod queries;
pub mod types;

pub use compose::ResponseComposer;
pub use errors::ChatError;
pub use intent::{classify, Intent};
pub use types::{ChatRequest, ComposedReply, Department, QueryRecord, ResponseSource};
