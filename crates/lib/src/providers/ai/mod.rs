pub mod gemini;
pub mod local;

use crate::errors::ChatError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a generative-AI provider.
///
/// This defines the single seam between the query resolution pipeline and
/// whichever Large Language Model backs the fallback path (Gemini, a local
/// OpenAI-compatible server, or a test double).
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ChatError>;
}

dyn_clone::clone_trait_object!(AiProvider);
