//! Conversation outcomes and the thresholds that produce them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::DomainError;

/// Categorical verdict assigned once, when a conversation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InterestedNextSteps,
    NeedsMoreInfo,
    NotAFit,
    MutualInterest,
    FollowUpLater,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InterestedNextSteps => "interested_next_steps",
            Self::NeedsMoreInfo => "needs_more_info",
            Self::NotAFit => "not_a_fit",
            Self::MutualInterest => "mutual_interest",
            Self::FollowUpLater => "follow_up_later",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interested_next_steps" => Ok(Self::InterestedNextSteps),
            "needs_more_info" => Ok(Self::NeedsMoreInfo),
            "not_a_fit" => Ok(Self::NotAFit),
            "mutual_interest" => Ok(Self::MutualInterest),
            "follow_up_later" => Ok(Self::FollowUpLater),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown outcome '{other}'"
            ))),
        }
    }
}

/// Thresholds for computing the final outcome from the engagement pair.
///
/// Checked in fixed descending order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutcomeThresholds {
    /// Both sides above this → mutual interest.
    #[serde(default = "default_mutual")]
    pub mutual: f64,
    /// Side B above this → interested, next steps.
    #[serde(default = "default_interested")]
    pub interested: f64,
    /// Side B above this → needs more info.
    #[serde(default = "default_needs_more_info")]
    pub needs_more_info: f64,
    /// Side B above this → follow up later; otherwise not a fit.
    #[serde(default = "default_follow_up")]
    pub follow_up: f64,
}

const fn default_mutual() -> f64 {
    0.7
}

const fn default_interested() -> f64 {
    0.7
}

const fn default_needs_more_info() -> f64 {
    0.5
}

const fn default_follow_up() -> f64 {
    0.3
}

impl Default for OutcomeThresholds {
    fn default() -> Self {
        Self {
            mutual: default_mutual(),
            interested: default_interested(),
            needs_more_info: default_needs_more_info(),
            follow_up: default_follow_up(),
        }
    }
}

impl OutcomeThresholds {
    /// Pure function of the final `(side_a, side_b)` engagement pair.
    pub fn compute(&self, side_a: f64, side_b: f64) -> Outcome {
        if side_b > self.mutual && side_a > self.mutual {
            Outcome::MutualInterest
        } else if side_b > self.interested {
            Outcome::InterestedNextSteps
        } else if side_b > self.needs_more_info {
            Outcome::NeedsMoreInfo
        } else if side_b > self.follow_up {
            Outcome::FollowUpLater
        } else {
            Outcome::NotAFit
        }
    }
}

/// Engagement levels that end a conversation early once `min_turns` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EarlyExitThresholds {
    /// Side B below this → not a fit.
    #[serde(default = "default_not_a_fit_below")]
    pub not_a_fit_below: f64,
    /// Side B above this (and side A above `mutual_side_a_above`) → mutual interest.
    #[serde(default = "default_mutual_side_b_above")]
    pub mutual_side_b_above: f64,
    #[serde(default = "default_mutual_side_a_above")]
    pub mutual_side_a_above: f64,
}

const fn default_not_a_fit_below() -> f64 {
    0.3
}

const fn default_mutual_side_b_above() -> f64 {
    0.8
}

const fn default_mutual_side_a_above() -> f64 {
    0.7
}

impl Default for EarlyExitThresholds {
    fn default() -> Self {
        Self {
            not_a_fit_below: default_not_a_fit_below(),
            mutual_side_b_above: default_mutual_side_b_above(),
            mutual_side_a_above: default_mutual_side_a_above(),
        }
    }
}

impl EarlyExitThresholds {
    pub fn check(&self, side_a: f64, side_b: f64) -> Option<Outcome> {
        if side_b < self.not_a_fit_below {
            Some(Outcome::NotAFit)
        } else if side_b > self.mutual_side_b_above && side_a > self.mutual_side_a_above {
            Some(Outcome::MutualInterest)
        } else {
            None
        }
    }
}
