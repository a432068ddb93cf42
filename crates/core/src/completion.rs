//! Completion backend trait — the abstraction over the model backend.
//!
//! The backend is consumed as a black-box text-completion service: one
//! prompt in, one reply out. Failures are a tagged `CompletionError`, not a
//! duck-typed success dictionary — a missing content field is a
//! `MalformedResponse`, never an empty string that silently flows onward.

use crate::error::CompletionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters for a single completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The fully rendered prompt.
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A successful completion. An empty or whitespace-only `content` must never
/// be constructed — backends map that case to
/// `CompletionError::MalformedResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReply {
    /// The generated text.
    pub content: String,

    /// Which model actually responded.
    pub model: String,
}

/// The model backend seam.
///
/// One attempt per call; retry policy, if any, belongs to the caller.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a prompt and get a complete reply.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionReply, CompletionError>;
}
