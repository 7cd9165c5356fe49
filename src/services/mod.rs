//! Conversation lifecycle services.
//!
//! The controller, phase machine and reviewer are the core; the generator,
//! index/matcher and batch runner are the surrounding pipeline.

pub mod batch;
pub mod conversation;
pub mod matching;
pub mod normalization;
pub mod persona_agent;
pub mod persona_generator;
pub mod phase_machine;
pub mod reviewer;
pub mod similarity;

pub use batch::run_bounded;
pub use conversation::{Conversation, ConversationEvent, ConversationResult};
pub use matching::{
    sanitize_index_name, IndexReport, MatchCandidate, PersonaIndex, PersonaMatcher,
};
pub use normalization::{has_concrete_next_step, normalize};
pub use persona_agent::PersonaAgent;
pub use persona_generator::{PersonaGenerator, PersonaRequest};
pub use phase_machine::{PhaseMachine, PhaseTransition};
pub use reviewer::DecisionReviewer;
pub use similarity::{cosine_similarity, SimilarityScorer};
