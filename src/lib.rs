//! Matchwright - persona conversation simulator and match reviewer
//!
//! Two personas talk through a phase-driven conversation, engagement is
//! scored turn by turn, and a reviewer decides whether the pair should move
//! to a next step. Persona generation and vector-based matching sit around
//! that core.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits and errors
//! - **Service Layer** (`services`): Conversation controller, phase machine,
//!   reviewer, persona generation and matching
//! - **Adapters** (`adapters`): OpenAI-compatible chat and embeddings,
//!   Pinecone and in-memory vector stores, scripted fakes
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use matchwright::adapters::mock::ScriptedAgent;
//! use matchwright::services::Conversation;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let a = Arc::new(ScriptedAgent::new("a", &["Hello"]));
//!     let b = Arc::new(ScriptedAgent::new("b", &["Interesting, tell me more"]));
//!     let result = Conversation::new(a, b, Default::default()).run().await?;
//!     println!("{}", result.outcome);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, ConversationConfig, Decision, EngagementMetrics, Outcome, Persona, Phase,
    ReviewDecision, ReviewResult, Speaker, Transcript, TurnRecord,
};
pub use domain::ports::{ChatModel, ConversationAgent, EmbeddingProvider, LlmError, VectorStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    Conversation, ConversationEvent, ConversationResult, DecisionReviewer, PersonaAgent,
    PersonaGenerator, PersonaIndex, PersonaMatcher,
};
