use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::engagement::EngagementRules;
use super::outcome::{EarlyExitThresholds, OutcomeThresholds};
use super::persona::Speaker;
use super::phase::DwellTargets;

/// Main configuration structure for matchwright
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Conversation lifecycle settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Decision review and normalization settings
    #[serde(default)]
    pub review: ReviewConfig,

    /// Chat-completion collaborator
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding collaborator
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Vector store used for persona matching
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Concurrency for batch work
    #[serde(default)]
    pub batch: BatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory holding prompt overrides (`ai_agent_prompt.md`,
    /// `chat_decision_prompt.md`, `persona_generation_prompt.md`)
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
}

/// Conversation lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversationConfig {
    /// Soft turn cap
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Earliest turn at which engagement heuristics may end the run
    #[serde(default = "default_min_turns")]
    pub min_turns: usize,

    /// Wind down through `closing` instead of hard-stopping at the cap
    #[serde(default = "default_ensure_completion")]
    pub ensure_completion: bool,

    /// Turns allowed in `closing` before the run ends (minimum 1)
    #[serde(default = "default_closing_grace")]
    pub closing_grace: usize,

    /// Absolute ceiling; defaults to `max_turns + 2 * closing_grace`
    #[serde(default)]
    pub hard_max_turns: Option<usize>,

    /// Side that speaks first
    #[serde(default)]
    pub start_with: Speaker,

    /// Number of recent turns inspected for dwell counting
    #[serde(default = "default_lookback_window")]
    pub lookback_window: usize,

    #[serde(default)]
    pub dwell: DwellTargets,

    #[serde(default)]
    pub engagement: EngagementRules,

    #[serde(default)]
    pub outcome_thresholds: OutcomeThresholds,

    #[serde(default)]
    pub early_exit: EarlyExitThresholds,
}

const fn default_max_turns() -> usize {
    10
}

const fn default_min_turns() -> usize {
    6
}

const fn default_ensure_completion() -> bool {
    true
}

const fn default_closing_grace() -> usize {
    2
}

const fn default_lookback_window() -> usize {
    10
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            min_turns: default_min_turns(),
            ensure_completion: default_ensure_completion(),
            closing_grace: default_closing_grace(),
            hard_max_turns: None,
            start_with: Speaker::default(),
            lookback_window: default_lookback_window(),
            dwell: DwellTargets::default(),
            engagement: EngagementRules::default(),
            outcome_thresholds: OutcomeThresholds::default(),
            early_exit: EarlyExitThresholds::default(),
        }
    }
}

impl ConversationConfig {
    /// Closing grace with the floor of one applied.
    pub fn effective_closing_grace(&self) -> usize {
        self.closing_grace.max(1)
    }

    /// Hard ceiling, derived from the soft cap when not set.
    pub fn effective_hard_max_turns(&self) -> usize {
        self.hard_max_turns
            .unwrap_or_else(|| self.max_turns + 2 * self.effective_closing_grace())
    }
}

/// Confidence caps applied during decision normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfidenceCaps {
    /// Declared outcome `not_a_fit`
    #[serde(default = "default_not_a_fit_cap")]
    pub not_a_fit: f64,
    /// Follow-up outcome, `proceed` downgraded
    #[serde(default = "default_outcome_downgrade_cap")]
    pub outcome_downgrade: f64,
    /// Follow-up outcome, no downgrade
    #[serde(default = "default_outcome_cap")]
    pub outcome: f64,
    /// Low similarity, `proceed` downgraded
    #[serde(default = "default_low_downgrade_cap")]
    pub low_similarity_downgrade: f64,
    /// Low similarity, `proceed` kept on an agreed next step
    #[serde(default = "default_low_next_step_cap")]
    pub low_similarity_next_step: f64,
    /// Low similarity, any other decision
    #[serde(default = "default_low_cap")]
    pub low_similarity: f64,
    /// Mid similarity
    #[serde(default = "default_mid_cap")]
    pub mid_similarity: f64,
}

const fn default_not_a_fit_cap() -> f64 {
    0.4
}

const fn default_outcome_downgrade_cap() -> f64 {
    0.55
}

const fn default_outcome_cap() -> f64 {
    0.65
}

const fn default_low_downgrade_cap() -> f64 {
    0.45
}

const fn default_low_next_step_cap() -> f64 {
    0.6
}

const fn default_low_cap() -> f64 {
    0.55
}

const fn default_mid_cap() -> f64 {
    0.75
}

impl Default for ConfidenceCaps {
    fn default() -> Self {
        Self {
            not_a_fit: default_not_a_fit_cap(),
            outcome_downgrade: default_outcome_downgrade_cap(),
            outcome: default_outcome_cap(),
            low_similarity_downgrade: default_low_downgrade_cap(),
            low_similarity_next_step: default_low_next_step_cap(),
            low_similarity: default_low_cap(),
            mid_similarity: default_mid_cap(),
        }
    }
}

/// Vocabulary for the concrete-next-step detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NextStepTerms {
    #[serde(default = "default_proposal_terms")]
    pub proposal: Vec<String>,
    #[serde(default = "default_acknowledgment_terms")]
    pub acknowledgment: Vec<String>,
}

fn default_proposal_terms() -> Vec<String> {
    [
        "schedule", "book", "set up", "arrange", "meet", "call", "demo", "pilot", "poc", "trial",
        "calendar", "invite", "intro", "follow up", "send", "share", "deck", "proposal", "contract",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_acknowledgment_terms() -> Vec<String> {
    [
        "let's",
        "lets",
        "i will",
        "i'll",
        "we will",
        "confirm",
        "confirmed",
        "works",
        "sounds good",
        "ok",
        "okay",
        "great",
        "looking forward",
        "see you",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for NextStepTerms {
    fn default() -> Self {
        Self {
            proposal: default_proposal_terms(),
            acknowledgment: default_acknowledgment_terms(),
        }
    }
}

/// Decision review and normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReviewConfig {
    /// Aggregate similarity below this is "low"
    #[serde(default = "default_low_similarity")]
    pub low_similarity: f64,

    /// Aggregate similarity below this (and not low) is "mid"
    #[serde(default = "default_mid_similarity")]
    pub mid_similarity: f64,

    #[serde(default)]
    pub caps: ConfidenceCaps,

    #[serde(default)]
    pub next_step_terms: NextStepTerms,
}

const fn default_low_similarity() -> f64 {
    0.35
}

const fn default_mid_similarity() -> f64 {
    0.5
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            low_similarity: default_low_similarity(),
            mid_similarity: default_mid_similarity(),
            caps: ConfidenceCaps::default(),
            next_step_terms: NextStepTerms::default(),
        }
    }
}

/// Chat-completion collaborator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// API key. Falls back to `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Try `fallback_model` when primary and nudge both come back empty
    #[serde(default)]
    pub fallback_enabled: bool,

    #[serde(default = "default_chat_model")]
    pub fallback_model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    1.0
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_tokens() -> Option<u32> {
    Some(160)
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            fallback_enabled: false,
            fallback_model: default_chat_model(),
        }
    }
}

/// Embedding collaborator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingsConfig {
    /// API key. Falls back to `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension; derived from the model when unset
    #[serde(default)]
    pub dimension: Option<usize>,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_embedding_batch")]
    pub max_batch_size: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

const fn default_embedding_batch() -> usize {
    2048
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimension: None,
            timeout_secs: default_embedding_timeout_secs(),
            max_batch_size: default_embedding_batch(),
        }
    }
}

impl EmbeddingsConfig {
    /// Configured dimension, else the known dimension of the model.
    pub fn resolved_dimension(&self) -> usize {
        self.dimension
            .unwrap_or_else(|| known_embedding_dimension(&self.model).unwrap_or(1536))
    }
}

/// Output dimension of well-known embedding models.
pub fn known_embedding_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        _ => None,
    }
}

/// Vector store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreProvider {
    #[default]
    Pinecone,
    Memory,
}

/// Vector store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub provider: VectorStoreProvider,

    /// API key. Falls back to `PINECONE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Data-plane host of the index, e.g. `https://my-index-abc.svc.pinecone.io`
    #[serde(default)]
    pub index_host: Option<String>,

    /// Base namespace; personas go to `<ns>__needs` and `<ns>__personality`
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_upsert_batch")]
    pub upsert_batch_size: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_namespace() -> String {
    "default".to_string()
}

const fn default_upsert_batch() -> usize {
    100
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::default(),
            api_key: None,
            index_host: None,
            namespace: default_namespace(),
            upsert_batch_size: default_upsert_batch(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

/// Batch concurrency configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

const fn default_concurrency() -> usize {
    5
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_max_defaults_from_grace() {
        let c = ConversationConfig::default();
        assert_eq!(c.effective_hard_max_turns(), 14);

        let c = ConversationConfig {
            closing_grace: 0,
            max_turns: 4,
            ..Default::default()
        };
        assert_eq!(c.effective_closing_grace(), 1);
        assert_eq!(c.effective_hard_max_turns(), 6);

        let c = ConversationConfig {
            hard_max_turns: Some(30),
            ..Default::default()
        };
        assert_eq!(c.effective_hard_max_turns(), 30);
    }

    #[test]
    fn test_embedding_dimension_resolution() {
        let mut e = EmbeddingsConfig::default();
        assert_eq!(e.resolved_dimension(), 1536);
        e.model = "text-embedding-3-large".to_string();
        assert_eq!(e.resolved_dimension(), 3072);
        e.dimension = Some(42);
        assert_eq!(e.resolved_dimension(), 42);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
conversation:
  max_turns: 12
  start_with: side_b
review:
  caps:
    mid_similarity: 0.7
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.conversation.max_turns, 12);
        assert_eq!(config.conversation.min_turns, 6);
        assert_eq!(config.conversation.start_with, Speaker::SideB);
        assert!((config.review.caps.mid_similarity - 0.7).abs() < f64::EPSILON);
        assert!((config.review.caps.not_a_fit - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.review.next_step_terms.proposal.len(), 19);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }
}
