use matchwright::domain::models::{
    Decision, Outcome, Phase, ReviewConfig, ReviewDecision, SimilaritySignals, Speaker,
    Transcript, TurnRecord,
};
use matchwright::services::normalization::{decision_from_value, round_confidence};
use matchwright::services::normalize;
use proptest::prelude::*;
use serde_json::json;

const PHRASES: &[&str] = &[
    "let's schedule a call",
    "sounds good",
    "confirmed",
    "send the deck",
    "not sure",
    "tell me more",
    "okay",
    "our margins",
];

fn decision() -> impl Strategy<Value = Decision> {
    prop_oneof![
        Just(Decision::Proceed),
        Just(Decision::MoreInfo),
        Just(Decision::NotAFit)
    ]
}

fn outcome() -> impl Strategy<Value = Option<Outcome>> {
    prop_oneof![
        Just(None),
        Just(Some(Outcome::MutualInterest)),
        Just(Some(Outcome::InterestedNextSteps)),
        Just(Some(Outcome::NeedsMoreInfo)),
        Just(Some(Outcome::FollowUpLater)),
        Just(Some(Outcome::NotAFit)),
    ]
}

fn transcript() -> impl Strategy<Value = Transcript> {
    prop::collection::vec((prop::sample::select(PHRASES), any::<bool>()), 0..8).prop_map(|turns| {
        let mut t = Transcript::new();
        for (text, side_a) in turns {
            let speaker = if side_a { Speaker::SideA } else { Speaker::SideB };
            t.push(TurnRecord::new(speaker, text, Phase::Discovery));
        }
        t
    })
}

proptest! {
    /// Property: normalization only lowers confidence
    ///
    /// The result never exceeds the reviewer's own confidence nor any cap
    /// that applies to the outcome and similarity band.
    #[test]
    fn prop_normalization_never_raises_confidence(
        raw_decision in decision(),
        raw_confidence in 0.0f64..=1.0,
        declared in outcome(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        chat in transcript(),
    ) {
        let policy = ReviewConfig::default();
        let signals = SimilaritySignals::from_pair(a, b);
        let raw = ReviewDecision {
            decision: raw_decision,
            confidence: raw_confidence,
            rationale: String::new(),
        };

        let out = normalize(raw, declared, &signals, &chat, &policy);

        prop_assert!(out.confidence <= raw_confidence);
        prop_assert!(out.confidence >= 0.0);
        if declared == Some(Outcome::NotAFit) {
            prop_assert_eq!(out.decision, Decision::NotAFit);
            prop_assert!(out.confidence <= policy.caps.not_a_fit);
        }
        if matches!(declared, Some(Outcome::NeedsMoreInfo | Outcome::FollowUpLater)) {
            prop_assert!(out.confidence <= policy.caps.outcome);
        }
        if signals.aggregate < policy.low_similarity {
            prop_assert!(out.confidence <= policy.caps.low_similarity_next_step);
        } else if signals.aggregate < policy.mid_similarity {
            prop_assert!(out.confidence <= policy.caps.mid_similarity);
        }
    }

    /// Property: normalization never upgrades a decision to proceed
    #[test]
    fn prop_normalization_never_creates_proceed(
        raw_decision in decision(),
        raw_confidence in 0.0f64..=1.0,
        declared in outcome(),
        a in 0.0f64..=1.0,
        chat in transcript(),
    ) {
        let raw = ReviewDecision {
            decision: raw_decision,
            confidence: raw_confidence,
            rationale: String::new(),
        };
        let out = normalize(
            raw,
            declared,
            &SimilaritySignals::from_pair(a, a),
            &chat,
            &ReviewConfig::default(),
        );
        if raw_decision != Decision::Proceed {
            prop_assert_ne!(out.decision, Decision::Proceed);
        }
    }

    /// Property: two-decimal rounding never rounds up
    #[test]
    fn prop_rounding_never_exceeds_input(value in 0.0f64..=1.0) {
        let rounded = round_confidence(value);
        prop_assert!(rounded <= value);
        prop_assert!(value - rounded < 0.02);
    }

    /// Property: parsed confidence always lands in [0, 1]
    #[test]
    fn prop_parsed_confidence_is_unit(confidence in proptest::num::f64::ANY) {
        let value = json!({"decision": "proceed", "confidence": confidence});
        let parsed = decision_from_value(&value);
        prop_assert!((0.0..=1.0).contains(&parsed.confidence));
    }
}

#[test]
fn test_not_a_fit_scenario() {
    let raw = ReviewDecision {
        decision: Decision::Proceed,
        confidence: 0.9,
        rationale: "Good match".to_string(),
    };
    let out = normalize(
        raw,
        Some(Outcome::NotAFit),
        &SimilaritySignals::from_pair(0.9, 0.9),
        &Transcript::new(),
        &ReviewConfig::default(),
    );
    assert_eq!(out.decision, Decision::NotAFit);
    assert!(out.confidence <= 0.4);
}

#[test]
fn test_low_similarity_scenario() {
    let raw = ReviewDecision {
        decision: Decision::Proceed,
        confidence: 0.8,
        rationale: String::new(),
    };
    let out = normalize(
        raw,
        None,
        &SimilaritySignals::from_pair(0.2, 0.2),
        &Transcript::new(),
        &ReviewConfig::default(),
    );
    assert_eq!(out.decision, Decision::MoreInfo);
    assert!(out.confidence <= 0.45);
}
