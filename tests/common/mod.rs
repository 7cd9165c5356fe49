//! Common test utilities for integration tests
//!
//! Shared fixtures for driving conversations and reviews with the
//! deterministic fakes in `matchwright::adapters::mock`.

#![allow(dead_code)]

use std::sync::Arc;

use matchwright::adapters::mock::{FixedEmbeddingProvider, ScriptedAgent, ScriptedChatModel};
use matchwright::domain::models::{
    Persona, Phase, ReviewConfig, Speaker, Transcript, TurnRecord,
};
use matchwright::domain::ports::{ConversationAgent, EmbeddingProvider};
use matchwright::services::DecisionReviewer;

/// Two scripted agents, `alice` on side A and `bob` on side B.
pub fn agents(
    side_a: &[&str],
    side_b: &[&str],
) -> (Arc<dyn ConversationAgent>, Arc<dyn ConversationAgent>) {
    (
        Arc::new(ScriptedAgent::new("alice", side_a)),
        Arc::new(ScriptedAgent::new("bob", side_b)),
    )
}

/// Transcript from `(speaker, message)` pairs, all tagged `discovery`.
pub fn transcript(turns: &[(Speaker, &str)]) -> Transcript {
    let mut t = Transcript::new();
    for (speaker, message) in turns {
        t.push(TurnRecord::new(*speaker, *message, Phase::Discovery));
    }
    t
}

pub fn founder() -> Persona {
    Persona::new(
        "founder",
        "seed funding for a logistics startup",
        "driven, data-oriented",
    )
}

pub fn investor() -> Persona {
    Persona::new(
        "investor",
        "early-stage logistics deals",
        "analytical, patient",
    )
}

/// Every text embeds to the same vector, so aggregate similarity is 1.0.
pub fn aligned_embeddings() -> Arc<dyn EmbeddingProvider> {
    Arc::new(FixedEmbeddingProvider::new(2).with_default(vec![1.0, 0.0]))
}

/// Needs and personalities embed orthogonally, so aggregate similarity is 0.0.
pub fn orthogonal_embeddings(a: &Persona, b: &Persona) -> Arc<dyn EmbeddingProvider> {
    Arc::new(
        FixedEmbeddingProvider::new(2)
            .with(&a.needs, vec![1.0, 0.0])
            .with(&b.needs, vec![1.0, 0.0])
            .with(&a.personality, vec![0.0, 1.0])
            .with(&b.personality, vec![0.0, 1.0]),
    )
}

/// Reviewer whose chat model answers every call with `reply`.
pub fn reviewer(
    reply: &str,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
) -> (DecisionReviewer, Arc<ScriptedChatModel>) {
    let model = Arc::new(ScriptedChatModel::new(vec![Ok(reply.to_string())]));
    let reviewer = DecisionReviewer::new(model.clone(), embeddings, ReviewConfig::default());
    (reviewer, model)
}
