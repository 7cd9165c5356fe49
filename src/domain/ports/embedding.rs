//! Embedding provider port.
//!
//! Converts profile text into dense vectors for similarity scoring and
//! persona matching.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A single embedding request item.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Correlation ID echoed back in the output.
    pub id: String,
    pub text: String,
}

/// A single embedding result.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub id: String,
    pub vector: Vec<f32>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "fixed", "null").
    fn name(&self) -> &'static str;

    /// Embedding dimension, fixed per deployment.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;

    /// Embed several texts. Implementations chunk by `max_batch_size`.
    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>>;

    /// Maximum number of texts per single request.
    fn max_batch_size(&self) -> usize;

    /// Embed `texts` and return vectors in input order.
    async fn embed_texts(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let inputs: Vec<EmbeddingInput> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| EmbeddingInput {
                id: i.to_string(),
                text: text.clone(),
            })
            .collect();
        let mut outputs = self.embed_batch(&inputs).await?;
        outputs.sort_by_key(|o| o.id.parse::<usize>().unwrap_or(usize::MAX));
        Ok(outputs.into_iter().map(|o| o.vector).collect())
    }
}
