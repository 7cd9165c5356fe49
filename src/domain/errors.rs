//! Domain errors for the matchwright conversation engine.

use thiserror::Error;

use super::ports::llm::LlmError;

/// Domain-level errors that can occur while running or reviewing a conversation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Agent response failed for {speaker}: {source}")]
    AgentFailed {
        speaker: String,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Malformed decision payload: {0}")]
    MalformedDecision(String),

    #[error("Malformed persona payload for {id}: {reason}")]
    MalformedPersona { id: String, reason: String },

    #[error("Invalid persona: {0}")]
    InvalidPersona(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_is_transparent() {
        let err: DomainError = LlmError::EmptyResponse.into();
        assert_eq!(err.to_string(), LlmError::EmptyResponse.to_string());
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DomainError = parse.into();
        assert!(matches!(err, DomainError::Serialization(_)));
    }
}
