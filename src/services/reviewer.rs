//! Post-hoc decision reviewer.
//!
//! Combines similarity signals with an LLM verdict and normalizes the verdict
//! so it cannot contradict the declared outcome or a weak profile match.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Outcome, Persona, ReviewConfig, ReviewResult, Transcript};
use crate::domain::ports::{ChatModel, EmbeddingProvider, LlmError};
use crate::services::normalization::{decision_from_value, normalize, parse_payload};
use crate::services::similarity::SimilarityScorer;

const PROMPT_FILE: &str = "chat_decision_prompt.md";

const DEFAULT_REVIEW_PROMPT: &str = "You are an impartial reviewer. Read the conversation and \
return a JSON with keys: decision ('proceed'|'more_info'|'not_a_fit'), rationale (<=80 words), \
confidence (0.0-1.0).";

pub struct DecisionReviewer {
    model: Arc<dyn ChatModel>,
    similarity: SimilarityScorer,
    policy: ReviewConfig,
    system_prompt: String,
}

impl DecisionReviewer {
    pub fn new(
        model: Arc<dyn ChatModel>,
        embeddings: Option<Arc<dyn EmbeddingProvider>>,
        policy: ReviewConfig,
    ) -> Self {
        Self {
            model,
            similarity: SimilarityScorer::new(embeddings),
            policy,
            system_prompt: DEFAULT_REVIEW_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Read `chat_decision_prompt.md` from `prompts_dir`, or use the built-in prompt.
    pub fn load_system_prompt(prompts_dir: Option<&Path>) -> String {
        prompts_dir
            .map(|dir| dir.join(PROMPT_FILE))
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Falling back to default review prompt");
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_REVIEW_PROMPT.to_string())
    }

    /// Review one conversation between `side_a` and `side_b`.
    ///
    /// Fails only when the chat model errors or its reply is not JSON even
    /// after removing code fences.
    pub async fn review(
        &self,
        side_a: &Persona,
        side_b: &Persona,
        transcript: &Transcript,
        outcome: Option<Outcome>,
    ) -> DomainResult<ReviewResult> {
        let signals = self.similarity.score(side_a, side_b).await;

        let payload = json!({
            "persona_1": side_a,
            "persona_2": side_b,
            "similarity_signals": signals,
            "conversation_outcome": outcome,
            "conversation": transcript,
        });

        info!(model = self.model.model(), "Decision review started");
        let started = Instant::now();
        let reply = match self
            .model
            .generate(&self.system_prompt, &payload.to_string())
            .await
        {
            Ok(text) => text,
            Err(LlmError::EmptyResponse) => String::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Decision review received response"
        );

        let raw = decision_from_value(&parse_payload(&reply)?);
        let chat_decision = normalize(raw, outcome, &signals, transcript, &self.policy);
        info!(
            decision = %chat_decision.decision,
            confidence = chat_decision.confidence,
            "Decision review done"
        );

        Ok(ReviewResult {
            similarity_score: signals.aggregate,
            similarity_signals: signals,
            chat_decision,
            chat: transcript.clone(),
        })
    }
}
