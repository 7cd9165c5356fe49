//! Engagement metrics and the keyword tables that drive them.

use serde::{Deserialize, Serialize};

use super::persona::Speaker;

/// Keyword tables scanned against each turn's text.
///
/// Matching is a case-insensitive substring test; each keyword counts at most
/// once per text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KeywordTables {
    /// Interest markers in side B's turns.
    #[serde(default = "default_positive")]
    pub positive: Vec<String>,
    /// Concern markers in side B's turns.
    #[serde(default = "default_negative")]
    pub negative: Vec<String>,
    /// Traction markers in side A's turns.
    #[serde(default = "default_confidence")]
    pub confidence: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_positive() -> Vec<String> {
    owned(&["interesting", "impressive", "exciting", "great", "next steps"])
}

fn default_negative() -> Vec<String> {
    owned(&["concern", "worried", "risky", "challenging", "difficult"])
}

fn default_confidence() -> Vec<String> {
    owned(&["validated", "growing", "traction", "customers"])
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            positive: default_positive(),
            negative: default_negative(),
            confidence: default_confidence(),
        }
    }
}

/// Per-match engagement adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngagementWeights {
    #[serde(default = "default_positive_increment")]
    pub positive_increment: f64,
    #[serde(default = "default_negative_decrement")]
    pub negative_decrement: f64,
    #[serde(default = "default_confidence_increment")]
    pub confidence_increment: f64,
}

const fn default_positive_increment() -> f64 {
    0.05
}

const fn default_negative_decrement() -> f64 {
    0.03
}

const fn default_confidence_increment() -> f64 {
    0.03
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            positive_increment: default_positive_increment(),
            negative_decrement: default_negative_decrement(),
            confidence_increment: default_confidence_increment(),
        }
    }
}

/// Keyword tables plus the weights applied per match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngagementRules {
    #[serde(default)]
    pub keywords: KeywordTables,
    #[serde(default)]
    pub weights: EngagementWeights,
}

/// Running engagement state for one conversation.
///
/// Both scores stay within `[0.0, 1.0]`; every adjustment is clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub turn_count: usize,
    pub side_a_engagement: f64,
    pub side_b_engagement: f64,
    pub positive_signals: Vec<String>,
    pub red_flags: Vec<String>,
    pub key_concerns_addressed: Vec<String>,
}

impl Default for EngagementMetrics {
    fn default() -> Self {
        Self {
            turn_count: 0,
            side_a_engagement: 0.5,
            side_b_engagement: 0.5,
            positive_signals: Vec::new(),
            red_flags: Vec::new(),
            key_concerns_addressed: Vec::new(),
        }
    }
}

impl EngagementMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `text` spoken by `speaker` and adjust the scores.
    ///
    /// Side B moves up on positive markers and down on negative ones. Side A
    /// only ever gains, on confidence markers; it has no negative path.
    pub fn update(&mut self, text: &str, speaker: Speaker, rules: &EngagementRules) {
        let low = text.to_lowercase();
        let weights = &rules.weights;

        match speaker {
            Speaker::SideB => {
                for term in matches(&low, &rules.keywords.positive) {
                    self.side_b_engagement =
                        clamp_unit(self.side_b_engagement + weights.positive_increment);
                    self.positive_signals.push(term.to_string());
                }
                for term in matches(&low, &rules.keywords.negative) {
                    self.side_b_engagement =
                        clamp_unit(self.side_b_engagement - weights.negative_decrement);
                    self.red_flags.push(term.to_string());
                }
            }
            Speaker::SideA => {
                for _ in matches(&low, &rules.keywords.confidence) {
                    self.side_a_engagement =
                        clamp_unit(self.side_a_engagement + weights.confidence_increment);
                }
            }
        }
    }

    /// Engagement score of one side.
    pub const fn engagement(&self, speaker: Speaker) -> f64 {
        match speaker {
            Speaker::SideA => self.side_a_engagement,
            Speaker::SideB => self.side_b_engagement,
        }
    }
}

fn matches<'a>(low: &'a str, table: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
    table
        .iter()
        .map(String::as_str)
        .filter(move |term| !term.is_empty() && low.contains(&term.to_lowercase()))
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_defaults_start_at_half() {
        let m = EngagementMetrics::new();
        assert_eq!(m.turn_count, 0);
        assert!(approx(m.side_a_engagement, 0.5));
        assert!(approx(m.side_b_engagement, 0.5));
    }

    #[test]
    fn test_side_b_positive_and_negative() {
        let rules = EngagementRules::default();
        let mut m = EngagementMetrics::new();
        m.update(
            "This is Interesting and impressive, but I have a concern.",
            Speaker::SideB,
            &rules,
        );
        assert!(approx(m.side_b_engagement, 0.5 + 0.05 + 0.05 - 0.03));
        assert_eq!(m.positive_signals, vec!["interesting", "impressive"]);
        assert_eq!(m.red_flags, vec!["concern"]);
        assert!(approx(m.side_a_engagement, 0.5));
    }

    #[test]
    fn test_keyword_counts_once_per_text() {
        let rules = EngagementRules::default();
        let mut m = EngagementMetrics::new();
        m.update("great great great", Speaker::SideB, &rules);
        assert!(approx(m.side_b_engagement, 0.55));
    }

    #[test]
    fn test_side_a_has_no_negative_path() {
        let rules = EngagementRules::default();
        let mut m = EngagementMetrics::new();
        m.update("Risky and difficult, but customers validated it", Speaker::SideA, &rules);
        assert!(approx(m.side_a_engagement, 0.56));
        assert!(m.red_flags.is_empty());
        assert!(approx(m.side_b_engagement, 0.5));
    }

    #[test]
    fn test_clamped_at_bounds() {
        let rules = EngagementRules::default();
        let mut m = EngagementMetrics::new();
        for _ in 0..40 {
            m.update("exciting next steps", Speaker::SideB, &rules);
        }
        assert!(approx(m.side_b_engagement, 1.0));
        for _ in 0..100 {
            m.update("worried and risky", Speaker::SideB, &rules);
        }
        assert!(approx(m.side_b_engagement, 0.0));
    }

    #[test]
    fn test_custom_tables() {
        let rules = EngagementRules {
            keywords: KeywordTables {
                positive: vec!["LOVE".to_string()],
                negative: vec![],
                confidence: vec![],
            },
            weights: EngagementWeights {
                positive_increment: 0.2,
                ..Default::default()
            },
        };
        let mut m = EngagementMetrics::new();
        m.update("we love it", Speaker::SideB, &rules);
        assert!(approx(m.side_b_engagement, 0.7));
    }
}
