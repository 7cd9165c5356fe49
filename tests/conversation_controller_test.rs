//! Conversation controller integration tests
//!
//! Drives full runs with scripted agents and checks phase progression,
//! termination rules, failure handling and the event stream.

mod common;

use futures::StreamExt;
use std::sync::Arc;

use matchwright::adapters::mock::{FailingAgent, ScriptedAgent};
use matchwright::domain::models::{ConversationConfig, Outcome, Phase, Speaker};
use matchwright::domain::ports::ConversationAgent;
use matchwright::services::{Conversation, ConversationEvent};
use matchwright::DomainError;

use common::agents;

#[tokio::test]
async fn test_introduction_advances_to_discovery_after_two_turns() {
    let (a, b) = agents(&["hello"], &["hi"]);
    let mut conversation = Conversation::new(a, b, ConversationConfig::default());

    let mut events = Vec::new();
    while let Some(event) = conversation.next_event().await.unwrap() {
        events.push(event);
        if conversation.transcript().len() == 3 {
            break;
        }
    }

    let turns = conversation.transcript().turns();
    assert_eq!(turns[0].phase_at_time, Phase::Introduction);
    assert_eq!(turns[1].phase_at_time, Phase::Introduction);
    assert_eq!(turns[2].phase_at_time, Phase::Discovery);

    let first_change = events.iter().find_map(|e| match e {
        ConversationEvent::PhaseChanged(t) => Some(*t),
        _ => None,
    });
    let change = first_change.expect("a phase change before turn 3");
    assert_eq!((change.from, change.to, change.forced), (Phase::Introduction, Phase::Discovery, false));
}

#[tokio::test]
async fn test_run_terminates_within_hard_max_regardless_of_content() {
    for (max_turns, closing_grace) in [(1, 1), (3, 1), (5, 2), (10, 2), (12, 4)] {
        let (a, b) = agents(&["neutral words"], &["more neutral words"]);
        let config = ConversationConfig {
            max_turns,
            min_turns: 100,
            closing_grace,
            ..ConversationConfig::default()
        };
        let hard_max = config.effective_hard_max_turns();
        let mut conversation = Conversation::new(a, b, config);
        let result = conversation.run().await.unwrap();

        assert!(
            result.transcript.len() <= hard_max,
            "max_turns={max_turns}: {} turns exceeds hard max {hard_max}",
            result.transcript.len()
        );
        assert!(result.final_metrics.turn_count <= hard_max + 1);
    }
}

#[tokio::test]
async fn test_forced_closing_is_marked_forced() {
    let (a, b) = agents(&["neutral"], &["neutral"]);
    let config = ConversationConfig {
        max_turns: 3,
        min_turns: 100,
        ..ConversationConfig::default()
    };
    let mut conversation = Conversation::new(a, b, config);

    let mut forced = Vec::new();
    while let Some(event) = conversation.next_event().await.unwrap() {
        if let ConversationEvent::PhaseChanged(t) = event {
            if t.forced {
                forced.push(t);
            }
        }
    }
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0].to, Phase::Closing);

    let closing_turns = conversation
        .transcript()
        .iter()
        .filter(|t| t.phase_at_time == Phase::Closing)
        .count();
    assert_eq!(closing_turns, 2, "closing grace turns are spent winding down");
}

#[tokio::test]
async fn test_no_turns_after_end() {
    let (a, b) = agents(&["hello"], &["hi"]);
    let mut conversation = Conversation::new(a, b, ConversationConfig::default());
    let first = conversation.run().await.unwrap();

    assert!(conversation.is_finished());
    assert!(conversation.next_event().await.unwrap().is_none());
    let second = conversation.run().await.unwrap();
    assert_eq!(first.transcript, second.transcript);
    assert_eq!(first.outcome, second.outcome);
}

#[tokio::test]
async fn test_failed_turn_keeps_partial_transcript() {
    let side_a: Arc<dyn ConversationAgent> = Arc::new(ScriptedAgent::new("alice", &["hello"]));
    let side_b: Arc<dyn ConversationAgent> = Arc::new(FailingAgent::new("bob", 2));
    let mut conversation = Conversation::new(side_a, side_b, ConversationConfig::default());

    let err = conversation.run().await.unwrap_err();
    assert!(matches!(err, DomainError::AgentFailed { ref speaker, .. } if speaker == "bob"));

    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[4].speaker, Speaker::SideA);
    assert_eq!(turns[3].message, "bob turn 2");
    assert!(conversation.outcome().is_none());
    assert!(conversation.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_matches_drained_run() {
    let script_a = ["we have paying customers", "growing fast"];
    let script_b = ["interesting", "a concern about margins"];

    let (a, b) = agents(&script_a, &script_b);
    let drained = Conversation::new(a, b, ConversationConfig::default())
        .run()
        .await
        .unwrap();

    let (a, b) = agents(&script_a, &script_b);
    let events: Vec<_> = Conversation::new(a, b, ConversationConfig::default())
        .into_stream()
        .collect()
        .await;
    let events: Vec<ConversationEvent> = events.into_iter().map(Result::unwrap).collect();

    assert!(matches!(events.first(), Some(ConversationEvent::Started { max_turns: 10, .. })));
    let Some(ConversationEvent::Ended { outcome, turns, .. }) = events.last() else {
        panic!("stream must end with Ended");
    };
    assert_eq!(*outcome, drained.outcome);

    let streamed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ConversationEvent::Turn { turn, record, .. } => Some((*turn, record.message.clone())),
            _ => None,
        })
        .collect();
    let messages: Vec<_> = drained.transcript.iter().map(|t| t.message.clone()).collect();
    assert_eq!(streamed.iter().map(|(_, m)| m.clone()).collect::<Vec<_>>(), messages);
    assert!(streamed.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(*turns, drained.final_metrics.turn_count);
}

#[tokio::test]
async fn test_stream_yields_error_then_stops() {
    let side_a: Arc<dyn ConversationAgent> = Arc::new(FailingAgent::new("alice", 1));
    let side_b: Arc<dyn ConversationAgent> = Arc::new(ScriptedAgent::new("bob", &["hi"]));
    let events: Vec<_> = Conversation::new(side_a, side_b, ConversationConfig::default())
        .into_stream()
        .collect()
        .await;

    assert!(events.last().is_some_and(Result::is_err));
    assert_eq!(events.iter().filter(|e| e.is_err()).count(), 1);
}

#[tokio::test]
async fn test_empty_replies_are_recorded_not_fatal() {
    let (a, b) = agents(&[], &[]);
    let mut conversation = Conversation::new(a, b, ConversationConfig::default());
    let result = conversation.run().await.unwrap();

    assert!(!result.transcript.is_empty());
    assert!(result.transcript.iter().all(|t| t.message.is_empty()));
}

#[tokio::test]
async fn test_early_exit_waits_for_min_turns() {
    let (a, b) = agents(&["pitch"], &["worried, risky, difficult, a concern, challenging"]);
    let config = ConversationConfig {
        min_turns: 8,
        ..ConversationConfig::default()
    };
    let mut conversation = Conversation::new(a, b, config);
    let result = conversation.run().await.unwrap();

    assert_eq!(result.outcome, Outcome::NotAFit);
    assert_eq!(result.transcript.len(), 8);
}

#[tokio::test]
async fn test_side_a_language_never_lowers_its_engagement() {
    let (a, b) = agents(&["worried, risky, difficult, a concern"], &["ok"]);
    let mut conversation = Conversation::new(a, b, ConversationConfig::default());
    let result = conversation.run().await.unwrap();

    assert!((result.final_metrics.side_a_engagement - 0.5).abs() < f64::EPSILON);
    assert!(result.final_metrics.red_flags.is_empty());
}
