//! Turn records and the append-only transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::persona::Speaker;
use super::phase::Phase;

/// One recorded utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub message: String,
    /// Phase the conversation was in when the turn was produced.
    #[serde(alias = "state")]
    pub phase_at_time: Phase,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(speaker: Speaker, message: impl Into<String>, phase_at_time: Phase) -> Self {
        Self {
            speaker,
            message: message.into(),
            phase_at_time,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only history of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<TurnRecord>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: TurnRecord) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&TurnRecord> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TurnRecord> {
        self.turns.iter()
    }

    /// Number of turns tagged `phase` among the most recent `window` turns.
    pub fn turns_in_phase(&self, phase: Phase, window: usize) -> usize {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..]
            .iter()
            .filter(|t| t.phase_at_time == phase)
            .count()
    }
}

impl From<Vec<TurnRecord>> for Transcript {
    fn from(turns: Vec<TurnRecord>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TurnRecord;
    type IntoIter = std::slice::Iter<'a, TurnRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_in_phase_respects_window() {
        let mut t = Transcript::new();
        for _ in 0..3 {
            t.push(TurnRecord::new(Speaker::SideA, "hi", Phase::Introduction));
        }
        for _ in 0..9 {
            t.push(TurnRecord::new(Speaker::SideB, "more", Phase::Discovery));
        }
        assert_eq!(t.turns_in_phase(Phase::Discovery, 10), 9);
        assert_eq!(t.turns_in_phase(Phase::Introduction, 10), 1);
        assert_eq!(t.turns_in_phase(Phase::Introduction, 100), 3);
    }

    #[test]
    fn test_serializes_as_array_of_records() {
        let mut t = Transcript::new();
        t.push(TurnRecord::new(Speaker::SideB, "hello", Phase::Introduction));
        let value = serde_json::to_value(&t).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["speaker"], "side_b");
        assert_eq!(first["message"], "hello");
        assert_eq!(first["phase_at_time"], "introduction");
        assert!(first["timestamp"].is_string());

        let back: Transcript = serde_json::from_value(value).unwrap();
        assert_eq!(back, t);
    }
}
