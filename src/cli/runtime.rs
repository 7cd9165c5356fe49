//! Builds collaborators and services from a loaded [`Config`].
//!
//! Commands never construct HTTP adapters directly; they ask the runtime, so
//! missing credentials surface before any work starts.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::embeddings::OpenAiEmbeddingProvider;
use crate::adapters::llm::OpenAiChatModel;
use crate::adapters::vector::{InMemoryVectorStore, PineconeVectorStore};
use crate::domain::models::{Config, Persona, Speaker, VectorStoreProvider};
use crate::domain::ports::{
    ChatModel, ConversationAgent, EmbeddingProvider, NullEmbeddingProvider, VectorStore,
};
use crate::services::{DecisionReviewer, PersonaAgent, PersonaGenerator};

pub struct Runtime {
    pub config: Config,
}

impl Runtime {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    fn prompts_dir(&self) -> Option<&Path> {
        self.config.prompts_dir.as_deref()
    }

    pub fn chat_model(&self) -> Result<Arc<dyn ChatModel>> {
        let model = OpenAiChatModel::new(&self.config.llm)
            .context("Chat collaborator unavailable")?;
        Ok(Arc::new(model))
    }

    pub fn fallback_model(&self) -> Result<Option<Arc<dyn ChatModel>>> {
        let fallback = OpenAiChatModel::fallback(&self.config.llm)
            .context("Fallback chat collaborator unavailable")?;
        Ok(fallback.map(|m| Arc::new(m) as Arc<dyn ChatModel>))
    }

    /// Embedding provider, required.
    pub fn embeddings(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = OpenAiEmbeddingProvider::new(&self.config.embeddings)
            .context("Embedding collaborator unavailable")?;
        Ok(Arc::new(provider))
    }

    /// Embedding provider for similarity signals. Without credentials this
    /// is the null provider, so every signal scores 0.0.
    pub fn similarity_embeddings(&self) -> Arc<dyn EmbeddingProvider> {
        match self.embeddings() {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "Similarity signals disabled; defaulting to 0.0");
                Arc::new(NullEmbeddingProvider::new())
            }
        }
    }

    pub fn vector_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self.config.vector_store.provider {
            VectorStoreProvider::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
            VectorStoreProvider::Pinecone => {
                let store = PineconeVectorStore::new(&self.config.vector_store)
                    .context("Vector store unavailable")?;
                Ok(Arc::new(store))
            }
        }
    }

    /// The two conversation agents, each aware of its counterpart.
    pub fn persona_agents(
        &self,
        side_a: &Persona,
        side_b: &Persona,
    ) -> Result<(Arc<dyn ConversationAgent>, Arc<dyn ConversationAgent>)> {
        let model = self.chat_model()?;
        let fallback = self.fallback_model()?;
        let prompt = PersonaAgent::load_system_prompt(self.prompts_dir());

        let build = |role: Speaker, persona: &Persona, counterpart: &Persona| {
            let mut agent =
                PersonaAgent::new(role, persona.clone(), counterpart.clone(), Arc::clone(&model))
                    .with_system_prompt(prompt.clone());
            if let Some(ref fallback) = fallback {
                agent = agent.with_fallback(Arc::clone(fallback));
            }
            Arc::new(agent) as Arc<dyn ConversationAgent>
        };

        Ok((
            build(Speaker::SideA, side_a, side_b),
            build(Speaker::SideB, side_b, side_a),
        ))
    }

    pub fn reviewer(&self) -> Result<DecisionReviewer> {
        let prompt = DecisionReviewer::load_system_prompt(self.prompts_dir());
        Ok(DecisionReviewer::new(
            self.chat_model()?,
            Some(self.similarity_embeddings()),
            self.config.review.clone(),
        )
        .with_system_prompt(prompt))
    }

    pub fn generator(&self) -> Result<PersonaGenerator> {
        let prompt = PersonaGenerator::load_system_prompt(self.prompts_dir());
        Ok(PersonaGenerator::new(self.chat_model()?, self.config.batch.concurrency)
            .with_system_prompt(&prompt))
    }
}

/// Load a persona JSON file with a readable error.
pub fn load_persona(path: &Path) -> Result<Persona> {
    Persona::load(path).with_context(|| format!("Failed to load persona {}", path.display()))
}

/// Every `*.json` persona under `dir`, recursively, in path order.
pub fn load_personas_dir(dir: &Path) -> Result<Vec<Persona>> {
    if !dir.is_dir() {
        bail!("Persona directory not found: {}", dir.display());
    }
    let mut files = Vec::new();
    collect_json_files(dir, &mut files)?;
    files.sort();

    let mut personas = Vec::with_capacity(files.len());
    for path in files {
        match Persona::load(&path) {
            Ok(persona) => personas.push(persona),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable persona"),
        }
    }
    debug!(dir = %dir.display(), count = personas.len(), "Loaded personas");
    Ok(personas)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            // error dumps from batch generation are not personas
            if path.file_name().is_some_and(|n| n == "_errors") {
                continue;
            }
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

/// Write pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
