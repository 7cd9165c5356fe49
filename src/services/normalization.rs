//! Deterministic reconciliation of a reviewer verdict with outcome and
//! similarity signals.
//!
//! Normalization only ever lowers confidence. Every rule uses `min` against
//! the running value, and the final two-decimal rounding never rounds up
//! past it.

use serde_json::Value;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Decision, NextStepTerms, Outcome, ReviewConfig, ReviewDecision, SimilaritySignals, Transcript,
};

const NOTE_NOT_A_FIT: &str = "Conversation outcome indicates not_a_fit; normalized decision.";
const NOTE_OUTCOME_DOWNGRADE: &str =
    "Outcome suggests more info/follow-up; downgraded from proceed.";
const NOTE_LOW_GATED: &str =
    "Low similarity; proceeding gated without explicit mutually agreed next step.";
const NOTE_LOW_NEXT_STEP: &str =
    "Low similarity; allowing proceed due to explicit next step, confidence capped.";
const NOTE_LOW_CAPPED: &str = "Low similarity; confidence capped.";
const INVALID_OUTPUT_RATIONALE: &str = "Normalization: invalid reviewer output.";

/// True when one speaker proposes a concrete step and the other later
/// acknowledges it.
///
/// A proposing turn only updates the latest proposer; it never counts as
/// an acknowledgment itself.
pub fn has_concrete_next_step(transcript: &Transcript, terms: &NextStepTerms) -> bool {
    let mut last_proposer = None;
    for turn in transcript {
        let message = turn.message.to_lowercase();
        if contains_any(&message, &terms.proposal) {
            last_proposer = Some(turn.speaker);
            continue;
        }
        if last_proposer.is_some_and(|p| p != turn.speaker)
            && contains_any(&message, &terms.acknowledgment)
        {
            return true;
        }
    }
    false
}

fn contains_any(message: &str, terms: &[String]) -> bool {
    terms
        .iter()
        .any(|t| !t.is_empty() && message.contains(&t.to_lowercase()))
}

/// Parse raw reviewer text into JSON, tolerating code fences.
///
/// Blank text reads as `{}`. Text that is still not JSON after removing
/// fence lines is a [`DomainError::MalformedDecision`].
pub fn parse_payload(text: &str) -> DomainResult<Value> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    let stripped = strip_code_fences(text);
    serde_json::from_str(&stripped).map_err(|e| {
        DomainError::MalformedDecision(format!("{e}; payload: {}", preview(text)))
    })
}

/// Drop every line that starts with a code fence.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}

/// Fill a decision from parsed JSON, defaulting missing or unusable keys.
pub fn decision_from_value(value: &Value) -> ReviewDecision {
    let Some(obj) = value.as_object() else {
        return ReviewDecision {
            decision: Decision::MoreInfo,
            confidence: 0.3,
            rationale: INVALID_OUTPUT_RATIONALE.to_string(),
        };
    };

    let decision = obj
        .get("decision")
        .and_then(Value::as_str)
        .map_or(Decision::MoreInfo, Decision::from_label);

    let rationale = match obj.get("rationale") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let confidence = match obj.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())
    .map_or(0.5, |c| c.clamp(0.0, 1.0));

    ReviewDecision {
        decision,
        confidence,
        rationale,
    }
}

/// Two-decimal rounding that never exceeds `value`.
pub fn round_confidence(value: f64) -> f64 {
    let scaled = value * 100.0;
    [scaled.round(), scaled.floor(), scaled.floor() - 1.0]
        .into_iter()
        .map(|hundredths| hundredths / 100.0)
        .find(|candidate| *candidate <= value)
        .unwrap_or(0.0)
        .max(0.0)
}

/// Apply outcome gating, then similarity gating, then rounding.
pub fn normalize(
    raw: ReviewDecision,
    outcome: Option<Outcome>,
    signals: &SimilaritySignals,
    transcript: &Transcript,
    policy: &ReviewConfig,
) -> ReviewDecision {
    let caps = &policy.caps;
    let agreed_next_step = has_concrete_next_step(transcript, &policy.next_step_terms);
    let ReviewDecision {
        mut decision,
        mut confidence,
        mut rationale,
    } = raw;
    let mut notes: Vec<&'static str> = Vec::new();

    match outcome {
        Some(Outcome::NotAFit) => {
            decision = Decision::NotAFit;
            confidence = confidence.min(caps.not_a_fit);
            notes.push(NOTE_NOT_A_FIT);
        }
        Some(Outcome::NeedsMoreInfo | Outcome::FollowUpLater) => {
            if decision == Decision::Proceed && !agreed_next_step {
                decision = Decision::MoreInfo;
                confidence = confidence.min(caps.outcome_downgrade);
                notes.push(NOTE_OUTCOME_DOWNGRADE);
            } else {
                confidence = confidence.min(caps.outcome);
            }
        }
        _ => {}
    }

    if signals.aggregate < policy.low_similarity {
        if decision == Decision::Proceed && !agreed_next_step {
            decision = Decision::MoreInfo;
            confidence = confidence.min(caps.low_similarity_downgrade);
            notes.push(NOTE_LOW_GATED);
        } else if decision == Decision::Proceed {
            confidence = confidence.min(caps.low_similarity_next_step);
            notes.push(NOTE_LOW_NEXT_STEP);
        } else {
            confidence = confidence.min(caps.low_similarity);
            notes.push(NOTE_LOW_CAPPED);
        }
    } else if signals.aggregate < policy.mid_similarity {
        confidence = confidence.min(caps.mid_similarity);
    }

    for note in notes {
        info!(note, "Decision normalized");
        rationale = format!("{rationale}\nNote: {note}").trim().to_string();
    }

    ReviewDecision {
        decision,
        confidence: round_confidence(confidence),
        rationale,
    }
}
