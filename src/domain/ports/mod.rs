//! Port trait definitions (Hexagonal Architecture)
//!
//! Collaborator contracts the conversation core depends on:
//! - ChatModel: text generation
//! - EmbeddingProvider: text to vector
//! - VectorStore: namespaced upsert / top-k query
//! - ConversationAgent: next utterance for one side

pub mod agent;
pub mod embedding;
pub mod llm;
pub mod null_embedding;
pub mod vector_store;

pub use agent::ConversationAgent;
pub use embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
pub use llm::{ChatModel, LlmError};
pub use null_embedding::NullEmbeddingProvider;
pub use vector_store::{QueryMatch, VectorRecord, VectorStore};
