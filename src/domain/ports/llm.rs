//! Text-generation port.
//!
//! A `ChatModel` turns a system prompt plus a single user context block into
//! reply text. Blank replies are reported as [`LlmError::EmptyResponse`] so
//! callers can decide whether to retry.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a chat collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Chat model not configured: {0}")]
    NotConfigured(String),

    #[error("Chat model returned an empty response")]
    EmptyResponse,

    #[error("Chat request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid chat response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub const fn is_empty_response(&self) -> bool {
        matches!(self, Self::EmptyResponse)
    }
}

/// Trait for chat-completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Backend name (e.g., "openai", "scripted").
    fn name(&self) -> &'static str;

    /// Model identifier sent to the backend.
    fn model(&self) -> &str;

    /// Generate a reply. Implementations trim the text and return
    /// `EmptyResponse` instead of an empty string.
    async fn generate(&self, system_prompt: &str, context: &str) -> Result<String, LlmError>;
}
