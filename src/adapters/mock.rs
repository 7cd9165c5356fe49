//! Deterministic fakes for the collaborator ports.
//!
//! Used by unit and integration tests to drive the controller and reviewer
//! without network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Transcript;
use crate::domain::ports::{
    ChatModel, ConversationAgent, EmbeddingInput, EmbeddingOutput, EmbeddingProvider, LlmError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Agent that replays a fixed script, cycling when it runs out.
pub struct ScriptedAgent {
    id: String,
    script: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(id: impl Into<String>, script: &[&str]) -> Self {
        Self {
            id: id.into(),
            script: script.iter().map(|s| (*s).to_string()).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of replies produced so far.
    pub fn replies(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationAgent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn respond(&self, _transcript: &Transcript) -> DomainResult<String> {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        if self.script.is_empty() {
            return Ok(String::new());
        }
        Ok(self.script[n % self.script.len()].clone())
    }
}

/// Agent whose reply fails after a number of successful turns.
pub struct FailingAgent {
    id: String,
    succeed_for: usize,
    cursor: AtomicUsize,
}

impl FailingAgent {
    pub fn new(id: impl Into<String>, succeed_for: usize) -> Self {
        Self {
            id: id.into(),
            succeed_for,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConversationAgent for FailingAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn respond(&self, _transcript: &Transcript) -> DomainResult<String> {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        if n < self.succeed_for {
            Ok(format!("{} turn {}", self.id, n + 1))
        } else {
            Err(DomainError::AgentFailed {
                speaker: self.id.clone(),
                source: LlmError::RequestFailed("scripted failure".to_string()),
            })
        }
    }
}

enum Script {
    Queue(Vec<Result<String, LlmError>>),
    Keyed(Vec<(String, Result<String, LlmError>)>),
}

/// Chat model that returns queued replies in order, or replies chosen by
/// a substring of the context.
///
/// An exhausted queue or an unmatched key yields `EmptyResponse`. Blank
/// replies are reported as `EmptyResponse`, like a real backend.
pub struct ScriptedChatModel {
    script: Mutex<Script>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedChatModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            script: Mutex::new(Script::Queue(replies)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies chosen by the first key contained in the context.
    pub fn keyed(entries: Vec<(&str, Result<String, LlmError>)>) -> Self {
        Self {
            script: Mutex::new(Script::Keyed(
                entries
                    .into_iter()
                    .map(|(key, reply)| (key.to_string(), reply))
                    .collect(),
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Every `(system_prompt, context)` pair received, oldest first.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, system_prompt: &str, context: &str) -> Result<String, LlmError> {
        lock(&self.calls).push((system_prompt.to_string(), context.to_string()));
        let reply = match &mut *lock(&self.script) {
            Script::Queue(queue) => queue.pop().unwrap_or(Err(LlmError::EmptyResponse)),
            Script::Keyed(entries) => entries
                .iter()
                .find(|(key, _)| context.contains(key.as_str()))
                .map_or(Err(LlmError::EmptyResponse), |(_, reply)| reply.clone()),
        };
        match reply {
            Ok(text) if text.trim().is_empty() => Err(LlmError::EmptyResponse),
            other => other,
        }
    }
}

/// Embedding provider with a fixed text-to-vector table.
///
/// Unknown texts map to the default vector, or to zeros of `dimension`.
pub struct FixedEmbeddingProvider {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
    default: Option<Vec<f32>>,
    failing: bool,
}

impl FixedEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: HashMap::new(),
            default: None,
            failing: false,
        }
    }

    #[must_use]
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    #[must_use]
    pub fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default = Some(vector);
        self
    }

    /// Every call fails with an embedding error.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn lookup(&self, text: &str) -> DomainResult<Vec<f32>> {
        if self.failing {
            return Err(DomainError::Embedding("fixed provider set to fail".to_string()));
        }
        Ok(self
            .table
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddingProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        self.lookup(text)
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        inputs
            .iter()
            .map(|input| {
                Ok(EmbeddingOutput {
                    id: input.id.clone(),
                    vector: self.lookup(&input.text)?,
                })
            })
            .collect()
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_agent_cycles() {
        let agent = ScriptedAgent::new("a", &["one", "two"]);
        let t = Transcript::new();
        assert_eq!(agent.respond(&t).await.unwrap(), "one");
        assert_eq!(agent.respond(&t).await.unwrap(), "two");
        assert_eq!(agent.respond(&t).await.unwrap(), "one");
        assert_eq!(agent.replies(), 3);
    }

    #[tokio::test]
    async fn test_scripted_model_queue_then_empty() {
        let model = ScriptedChatModel::new(vec![Ok("first".to_string()), Ok("  ".to_string())]);
        assert_eq!(model.generate("s", "c").await.unwrap(), "first");
        assert_eq!(model.generate("s", "c").await, Err(LlmError::EmptyResponse));
        assert_eq!(model.generate("s", "c").await, Err(LlmError::EmptyResponse));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_model_keyed() {
        let model = ScriptedChatModel::keyed(vec![("alpha", Ok("A".to_string()))]);
        assert_eq!(model.generate("s", "has alpha inside").await.unwrap(), "A");
        assert_eq!(model.generate("s", "has alpha again").await.unwrap(), "A");
        assert!(model.generate("s", "nothing").await.is_err());
    }
}
