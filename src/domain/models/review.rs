//! Review decisions, similarity signals and the final review document.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::transcript::Transcript;

/// Verdict produced by the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    #[default]
    MoreInfo,
    NotAFit,
}

impl Decision {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::MoreInfo => "more_info",
            Self::NotAFit => "not_a_fit",
        }
    }

    /// Lenient parse used on model output; unknown labels read as `MoreInfo`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "proceed" => Self::Proceed,
            "not_a_fit" => Self::NotAFit,
            _ => Self::MoreInfo,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision with confidence in `[0, 1]` and free-text rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub decision: Decision,
    pub confidence: f64,
    pub rationale: String,
}

impl Default for ReviewDecision {
    fn default() -> Self {
        Self {
            decision: Decision::MoreInfo,
            confidence: 0.5,
            rationale: String::new(),
        }
    }
}

/// Cross needs-vs-personality similarity between two personas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SimilaritySignals {
    pub a_needs_vs_b_personality: f64,
    pub b_needs_vs_a_personality: f64,
    pub aggregate: f64,
}

impl SimilaritySignals {
    /// Build from the two directional scores, clamping each to `[0, 1]`.
    pub fn from_pair(a_needs_vs_b_personality: f64, b_needs_vs_a_personality: f64) -> Self {
        let a = a_needs_vs_b_personality.clamp(0.0, 1.0);
        let b = b_needs_vs_a_personality.clamp(0.0, 1.0);
        Self {
            a_needs_vs_b_personality: a,
            b_needs_vs_a_personality: b,
            aggregate: (a + b) / 2.0,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Complete output of a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub similarity_score: f64,
    pub similarity_signals: SimilaritySignals,
    pub chat_decision: ReviewDecision,
    pub chat: Transcript,
}
