//! Persona indexing and double matching over a vector store.
//!
//! Each persona is stored twice: its needs vector under `<ns>__needs` and its
//! personality vector under `<ns>__personality`. Matching queries each
//! namespace with the opposite field of the query persona and blends the two
//! scores.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Persona;
use crate::domain::ports::{EmbeddingProvider, QueryMatch, VectorRecord, VectorStore};

/// Candidates fetched per namespace, at least.
pub const MIN_CANDIDATES: usize = 20;
const MAX_INDEX_NAME: usize = 45;

pub fn needs_namespace(base: &str) -> String {
    format!("{base}__needs")
}

pub fn personality_namespace(base: &str) -> String {
    format!("{base}__personality")
}

/// Normalize a free-form name to a valid index name: lowercase `a-z0-9-`,
/// alphanumeric first character, at most 45 characters.
pub fn sanitize_index_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    let mut s = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let mapped = if c.is_whitespace() || c == '_' {
            '-'
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            c
        } else {
            continue;
        };
        if mapped == '-' && s.ends_with('-') {
            continue;
        }
        s.push(mapped);
    }

    if s.is_empty() {
        return "idx".to_string();
    }
    if !s.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        s.insert(0, 'i');
    }
    let truncated: String = s.chars().take(MAX_INDEX_NAME).collect();
    let trimmed = truncated.trim_end_matches('-');
    if trimmed.is_empty() {
        "idx".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Counts from an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexReport {
    pub personas: usize,
    pub vectors: usize,
}

/// Writes persona vectors into the two field namespaces.
pub struct PersonaIndex {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    namespace: String,
    batch_size: usize,
}

impl PersonaIndex {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        namespace: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            embeddings,
            store,
            namespace: namespace.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn upsert_all(&self, personas: &[Persona]) -> DomainResult<IndexReport> {
        let needs_ns = needs_namespace(&self.namespace);
        let personality_ns = personality_namespace(&self.namespace);
        let mut report = IndexReport::default();

        for chunk in personas.chunks(self.batch_size) {
            let needs: Vec<String> = chunk.iter().map(|p| p.needs.trim().to_string()).collect();
            let traits: Vec<String> = chunk
                .iter()
                .map(|p| p.personality.trim().to_string())
                .collect();
            let needs_vectors = self.embeddings.embed_texts(&needs).await?;
            let personality_vectors = self.embeddings.embed_texts(&traits).await?;
            if needs_vectors.len() != chunk.len() || personality_vectors.len() != chunk.len() {
                return Err(DomainError::Embedding(format!(
                    "expected {} vectors per field, got {} and {}",
                    chunk.len(),
                    needs_vectors.len(),
                    personality_vectors.len()
                )));
            }

            let records = |vectors: Vec<Vec<f32>>| -> Vec<VectorRecord> {
                chunk
                    .iter()
                    .zip(vectors)
                    .map(|(persona, values)| VectorRecord {
                        id: persona.id.clone(),
                        values,
                        metadata: json!({
                            "id": persona.id,
                            "needs": persona.needs,
                            "personality": persona.personality,
                        }),
                    })
                    .collect()
            };

            report.vectors += self.store.upsert(&needs_ns, &records(needs_vectors)).await?;
            report.vectors += self
                .store
                .upsert(&personality_ns, &records(personality_vectors))
                .await?;
            report.personas += chunk.len();
            debug!(indexed = report.personas, "Upserted persona batch");
        }

        info!(
            personas = report.personas,
            vectors = report.vectors,
            namespace = %self.namespace,
            "Persona index updated"
        );
        Ok(report)
    }
}

/// A ranked match for a query persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub score: f64,
    pub needs: String,
    pub personality: String,
}

/// Double matching: query needs against stored personalities and query
/// personality against stored needs.
pub struct PersonaMatcher {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    namespace: String,
}

impl PersonaMatcher {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embeddings,
            store,
            namespace: namespace.into(),
        }
    }

    /// Top `top_k` candidates scored `w1 * needs->personality + (1 - w1) *
    /// personality->needs`, with `w1 = clamp(w12, 0, 1)`. The query persona
    /// itself is excluded.
    pub async fn top_matches(
        &self,
        query: &Persona,
        top_k: usize,
        w12: f64,
    ) -> DomainResult<Vec<MatchCandidate>> {
        let vectors = self
            .embeddings
            .embed_texts(&[
                query.needs.trim().to_string(),
                query.personality.trim().to_string(),
            ])
            .await?;
        let [needs_vector, personality_vector] = vectors.as_slice() else {
            return Err(DomainError::Embedding(format!(
                "expected 2 vectors, got {}",
                vectors.len()
            )));
        };

        let fetch = top_k.max(MIN_CANDIDATES);
        let by_personality = self
            .store
            .query(&personality_namespace(&self.namespace), needs_vector, fetch)
            .await?;
        let by_needs = self
            .store
            .query(&needs_namespace(&self.namespace), personality_vector, fetch)
            .await?;

        let candidates = combine(&by_personality, &by_needs, w12, &query.id, top_k);
        info!(
            query = %query.id,
            candidates = candidates.len(),
            top_k,
            w12,
            "Persona matching done"
        );
        Ok(candidates)
    }
}

fn combine(
    first: &[QueryMatch],
    second: &[QueryMatch],
    w12: f64,
    exclude_id: &str,
    top_k: usize,
) -> Vec<MatchCandidate> {
    struct Entry<'a> {
        id: &'a str,
        score1: f64,
        score2: f64,
        metadata: &'a serde_json::Value,
    }

    let mut order: Vec<Entry<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (matches, is_first) in [(first, true), (second, false)] {
        for m in matches {
            let slot = *index.entry(m.id.as_str()).or_insert_with(|| {
                order.push(Entry {
                    id: &m.id,
                    score1: 0.0,
                    score2: 0.0,
                    metadata: &m.metadata,
                });
                order.len() - 1
            });
            if is_first {
                order[slot].score1 = m.score;
            } else {
                order[slot].score2 = m.score;
            }
        }
    }

    let w1 = w12.clamp(0.0, 1.0);
    let w2 = 1.0 - w1;
    let meta_text = |metadata: &serde_json::Value, key: &str| {
        metadata
            .get(key)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut ranked: Vec<MatchCandidate> = order
        .into_iter()
        .filter(|e| e.id != exclude_id)
        .map(|e| MatchCandidate {
            id: e.id.to_string(),
            score: w1 * e.score1 + w2 * e.score2,
            needs: meta_text(e.metadata, "needs"),
            personality: meta_text(e.metadata, "personality"),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);
    ranked
}
