//! Conversation phases and their dwell targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named stage of a conversation's progression.
///
/// Advancement follows [`Phase::ORDER`]; `Ended` is terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Introduction,
    Discovery,
    DeepDive,
    Challenges,
    Closing,
    Ended,
}

impl Phase {
    /// Total order used for advancement.
    pub const ORDER: [Self; 6] = [
        Self::Introduction,
        Self::Discovery,
        Self::DeepDive,
        Self::Challenges,
        Self::Closing,
        Self::Ended,
    ];

    /// The phase that follows this one. `Ended` maps to itself.
    pub fn next(self) -> Self {
        Self::ORDER
            .iter()
            .position(|p| *p == self)
            .and_then(|i| Self::ORDER.get(i + 1))
            .copied()
            .unwrap_or(Self::Ended)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }

    /// True for `Closing` and `Ended`, the phases a forced wind-down never overrides.
    pub const fn is_winding_down(self) -> bool {
        matches!(self, Self::Closing | Self::Ended)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Discovery => "discovery",
            Self::DeepDive => "deep_dive",
            Self::Challenges => "challenges",
            Self::Closing => "closing",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum turns observed within a phase before advancing is permitted.
///
/// The closing target is not stored here; it equals the run's closing grace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DwellTargets {
    #[serde(default = "default_introduction")]
    pub introduction: usize,
    #[serde(default = "default_discovery")]
    pub discovery: usize,
    #[serde(default = "default_deep_dive")]
    pub deep_dive: usize,
    #[serde(default = "default_challenges")]
    pub challenges: usize,
}

const fn default_introduction() -> usize {
    2
}

const fn default_discovery() -> usize {
    3
}

const fn default_deep_dive() -> usize {
    3
}

const fn default_challenges() -> usize {
    2
}

impl Default for DwellTargets {
    fn default() -> Self {
        Self {
            introduction: default_introduction(),
            discovery: default_discovery(),
            deep_dive: default_deep_dive(),
            challenges: default_challenges(),
        }
    }
}

impl DwellTargets {
    /// Dwell target for `phase`, or `None` for the terminal phase.
    pub fn target(&self, phase: Phase, closing_grace: usize) -> Option<usize> {
        match phase {
            Phase::Introduction => Some(self.introduction),
            Phase::Discovery => Some(self.discovery),
            Phase::DeepDive => Some(self.deep_dive),
            Phase::Challenges => Some(self.challenges),
            Phase::Closing => Some(closing_grace.max(1)),
            Phase::Ended => None,
        }
    }
}
