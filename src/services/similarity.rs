//! Cross needs-vs-personality similarity between two personas.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Persona, SimilaritySignals};
use crate::domain::ports::EmbeddingProvider;

/// Cosine similarity of two vectors. Zero-norm or mismatched inputs give 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Computes [`SimilaritySignals`] from an optional embedding provider.
///
/// Any failure (no provider, provider error, short response) yields zero
/// signals and a warning; it is never fatal.
#[derive(Clone, Default)]
pub struct SimilarityScorer {
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl SimilarityScorer {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { provider }
    }

    pub async fn score(&self, side_a: &Persona, side_b: &Persona) -> SimilaritySignals {
        info!(a = %side_a.id, b = %side_b.id, "Similarity started");
        let signals = match self.try_score(side_a, side_b).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "Similarity unavailable; signals default to 0.0");
                SimilaritySignals::zero()
            }
        };
        info!(
            aggregate = format!("{:.3}", signals.aggregate),
            a_needs_vs_b_personality = format!("{:.3}", signals.a_needs_vs_b_personality),
            b_needs_vs_a_personality = format!("{:.3}", signals.b_needs_vs_a_personality),
            "Similarity done"
        );
        signals
    }

    async fn try_score(&self, side_a: &Persona, side_b: &Persona) -> DomainResult<SimilaritySignals> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            DomainError::CollaboratorUnavailable("no embedding provider configured".to_string())
        })?;

        let texts = [
            side_a.needs.trim(),
            side_a.personality.trim(),
            side_b.needs.trim(),
            side_b.personality.trim(),
        ]
        .map(str::to_string);
        let vectors = provider.embed_texts(&texts).await?;
        let [a_needs, a_personality, b_needs, b_personality] = vectors.as_slice() else {
            return Err(DomainError::Embedding(format!(
                "expected 4 vectors, got {}",
                vectors.len()
            )));
        };

        Ok(SimilaritySignals::from_pair(
            cosine_similarity(a_needs, b_personality),
            cosine_similarity(b_needs, a_personality),
        ))
    }
}
