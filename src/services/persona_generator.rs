//! Persona generation from profile and resume text.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Persona;
use crate::domain::ports::{ChatModel, LlmError};
use crate::services::batch::run_bounded;
use crate::services::normalization::strip_code_fences;

const PROMPT_FILE: &str = "persona_generation_prompt.md";

const DEFAULT_GENERATION_PROMPT: &str = "You generate two concise fields (needs, personality) from \
PROFILE and RESUME. Each 40-60 words, one paragraph, professional tone. Output JSON with keys: id, \
needs, personality.";

pub const MAX_PROFILE_CHARS: usize = 6000;
pub const MAX_RESUME_CHARS: usize = 12000;

/// Source material for one persona.
#[derive(Debug, Clone, Default)]
pub struct PersonaRequest {
    pub entity_id: String,
    pub profile_text: Option<String>,
    pub resume_text: Option<String>,
}

#[derive(Clone)]
pub struct PersonaGenerator {
    model: Arc<dyn ChatModel>,
    system_prompt: Arc<str>,
    concurrency: usize,
}

impl PersonaGenerator {
    pub fn new(model: Arc<dyn ChatModel>, concurrency: usize) -> Self {
        Self {
            model,
            system_prompt: Arc::from(DEFAULT_GENERATION_PROMPT),
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Arc::from(prompt);
        self
    }

    /// Read `persona_generation_prompt.md` from `prompts_dir`, or use the built-in prompt.
    pub fn load_system_prompt(prompts_dir: Option<&Path>) -> String {
        prompts_dir
            .map(|dir| dir.join(PROMPT_FILE))
            .and_then(|path| std::fs::read_to_string(path).ok())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GENERATION_PROMPT.to_string())
    }

    /// Build the user message for one request.
    pub fn build_context(request: &PersonaRequest) -> String {
        format!(
            "ID: {}\n\nPROFILE:\n{}\n\nRESUME:\n{}\n",
            request.entity_id,
            truncate(request.profile_text.as_deref(), MAX_PROFILE_CHARS),
            truncate(request.resume_text.as_deref(), MAX_RESUME_CHARS),
        )
    }

    pub async fn generate(&self, request: &PersonaRequest) -> DomainResult<Persona> {
        debug!(id = %request.entity_id, "Generating persona");
        let context = Self::build_context(request);
        let raw = match self.model.generate(&self.system_prompt, &context).await {
            Ok(text) => text,
            Err(LlmError::EmptyResponse) => String::new(),
            Err(e) => return Err(e.into()),
        };

        let value = parse_persona_json(&raw).map_err(|reason| {
            error!(id = %request.entity_id, %reason, "Failed to parse persona JSON");
            DomainError::MalformedPersona {
                id: request.entity_id.clone(),
                reason,
            }
        })?;
        persona_from_value(&request.entity_id, &value)
    }

    /// Generate many personas, at most `concurrency` at a time.
    ///
    /// Results come back in input order; one failure does not stop the rest.
    pub async fn generate_batch(&self, requests: Vec<PersonaRequest>) -> Vec<DomainResult<Persona>> {
        let ids: Vec<String> = requests.iter().map(|r| r.entity_id.clone()).collect();
        let generator = self.clone();
        let results = run_bounded(requests, self.concurrency, move |request| {
            let generator = generator.clone();
            async move { generator.generate(&request).await }
        })
        .await;

        for (id, result) in ids.iter().zip(&results) {
            if let Err(e) = result {
                error!(id = %id, error = %e, "Persona generation failed");
            }
        }
        info!(
            total = results.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Persona batch finished"
        );
        results
    }
}

fn truncate(text: Option<&str>, limit: usize) -> String {
    text.unwrap_or_default().trim().chars().take(limit).collect()
}

/// Parse model output as JSON after stripping fences, falling back to the
/// outermost `{ ... }` span.
fn parse_persona_json(raw: &str) -> Result<Value, String> {
    let stripped = strip_code_fences(raw);
    match serde_json::from_str(&stripped) {
        Ok(value) => Ok(value),
        Err(first) => {
            let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) else {
                return Err(first.to_string());
            };
            if end <= start {
                return Err(first.to_string());
            }
            serde_json::from_str(&stripped[start..=end]).map_err(|e| e.to_string())
        }
    }
}

fn persona_from_value(entity_id: &str, value: &Value) -> DomainResult<Persona> {
    let obj = value.as_object().ok_or_else(|| DomainError::MalformedPersona {
        id: entity_id.to_string(),
        reason: "expected a JSON object".to_string(),
    })?;
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(entity_id);

    Ok(Persona::new(id, text("needs"), text("personality")))
}
