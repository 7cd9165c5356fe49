pub mod config;
pub mod engagement;
pub mod outcome;
pub mod persona;
pub mod phase;
pub mod review;
pub mod transcript;

pub use config::{
    BatchConfig, ConfidenceCaps, Config, ConversationConfig, EmbeddingsConfig, LlmConfig,
    LoggingConfig, NextStepTerms, ReviewConfig, VectorStoreConfig, VectorStoreProvider,
};
pub use engagement::{EngagementMetrics, EngagementRules, EngagementWeights, KeywordTables};
pub use outcome::{EarlyExitThresholds, Outcome, OutcomeThresholds};
pub use persona::{Persona, Speaker};
pub use phase::{DwellTargets, Phase};
pub use review::{Decision, ReviewDecision, ReviewResult, SimilaritySignals};
pub use transcript::{Transcript, TurnRecord};
