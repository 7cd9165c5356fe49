//! Conversation controller.
//!
//! Runs strict ping-pong turn-taking between two agents, drives the phase
//! machine, updates engagement metrics and applies the termination rules.
//! The controller is pull-based: [`Conversation::next_event`] advances the run
//! one event at a time, [`Conversation::run`] drains it to completion, and
//! [`Conversation::into_stream`] exposes the same sequence as a `Stream`.

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ConversationConfig, EngagementMetrics, Outcome, Phase, Speaker, Transcript, TurnRecord,
};
use crate::domain::ports::ConversationAgent;
use crate::services::phase_machine::{PhaseMachine, PhaseTransition};

const SNIPPET_CHARS: usize = 400;

/// Incremental events emitted while a conversation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversationEvent {
    Started {
        run_id: Uuid,
        side_a: String,
        side_b: String,
        max_turns: usize,
        hard_max_turns: usize,
    },
    PhaseChanged(PhaseTransition),
    Turn {
        turn: usize,
        record: TurnRecord,
        side_a_engagement: f64,
        side_b_engagement: f64,
    },
    Ended {
        outcome: Outcome,
        turns: usize,
        final_metrics: EngagementMetrics,
    },
}

/// Final output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub outcome: Outcome,
    pub final_metrics: EngagementMetrics,
    pub transcript: Transcript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Pending,
    Running,
    Finished,
    Failed,
}

/// One conversation between side A and side B.
///
/// Owns its metrics and transcript for the lifetime of the run. After a
/// failed turn the partial transcript stays readable through
/// [`Conversation::transcript`].
pub struct Conversation {
    run_id: Uuid,
    side_a: Arc<dyn ConversationAgent>,
    side_b: Arc<dyn ConversationAgent>,
    config: ConversationConfig,
    hard_max_turns: usize,
    phases: PhaseMachine,
    metrics: EngagementMetrics,
    transcript: Transcript,
    current: Speaker,
    outcome: Option<Outcome>,
    state: RunState,
    pending: VecDeque<ConversationEvent>,
    failure: Option<DomainError>,
}

impl Conversation {
    pub fn new(
        side_a: Arc<dyn ConversationAgent>,
        side_b: Arc<dyn ConversationAgent>,
        config: ConversationConfig,
    ) -> Self {
        let closing_grace = config.effective_closing_grace();
        let hard_max_turns = config.effective_hard_max_turns();
        let phases = PhaseMachine::new(config.dwell, closing_grace, config.lookback_window);
        let current = config.start_with;

        Self {
            run_id: Uuid::new_v4(),
            side_a,
            side_b,
            config,
            hard_max_turns,
            phases,
            metrics: EngagementMetrics::new(),
            transcript: Transcript::new(),
            current,
            outcome: None,
            state: RunState::Pending,
            pending: VecDeque::new(),
            failure: None,
        }
    }

    /// Identifier carried by this run's events and log lines.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn phase(&self) -> Phase {
        self.phases.phase()
    }

    pub const fn metrics(&self) -> &EngagementMetrics {
        &self.metrics
    }

    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub const fn hard_max_turns(&self) -> usize {
        self.hard_max_turns
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Finished | RunState::Failed)
    }

    /// Advance the run until the next event is available.
    ///
    /// Returns `Ok(None)` once the run has ended (or failed) and every
    /// queued event has been delivered. A failure is reported after the
    /// events queued before it, exactly once.
    pub async fn next_event(&mut self) -> DomainResult<Option<ConversationEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.state {
                RunState::Finished => return Ok(None),
                RunState::Failed => {
                    return match self.failure.take() {
                        Some(err) => Err(err),
                        None => Ok(None),
                    }
                }
                RunState::Pending => {
                    self.state = RunState::Running;
                    return Ok(Some(self.started_event()));
                }
                RunState::Running => {
                    if let Err(err) = self.step().await {
                        self.state = RunState::Failed;
                        self.failure = Some(err);
                    }
                }
            }
        }
    }

    /// Drain the event sequence and return the final result.
    pub async fn run(&mut self) -> DomainResult<ConversationResult> {
        while self.next_event().await?.is_some() {}
        let outcome = self.outcome.ok_or_else(|| {
            DomainError::ValidationFailed("conversation was aborted before it ended".to_string())
        })?;
        Ok(ConversationResult {
            outcome,
            final_metrics: self.metrics.clone(),
            transcript: self.transcript.clone(),
        })
    }

    /// Expose the event sequence as a stream. A failed turn is yielded as
    /// an `Err` item and ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = DomainResult<ConversationEvent>> + Send {
        stream::unfold(self, |mut conversation| async move {
            match conversation.next_event().await {
                Ok(Some(event)) => Some((Ok(event), conversation)),
                Ok(None) => None,
                Err(err) => Some((Err(err), conversation)),
            }
        })
    }

    fn started_event(&self) -> ConversationEvent {
        info!(
            run_id = %self.run_id,
            side_a = %self.side_a.id(),
            side_b = %self.side_b.id(),
            max_turns = self.config.max_turns,
            hard_max_turns = self.hard_max_turns,
            start_with = %self.current,
            "Conversation started"
        );
        ConversationEvent::Started {
            run_id: self.run_id,
            side_a: self.side_a.id().to_string(),
            side_b: self.side_b.id().to_string(),
            max_turns: self.config.max_turns,
            hard_max_turns: self.hard_max_turns,
        }
    }

    /// One iteration of the turn loop.
    async fn step(&mut self) -> DomainResult<()> {
        self.metrics.turn_count += 1;

        if let Some(transition) = self.phases.step(&self.transcript) {
            self.on_transition(transition);
        }

        if self.config.ensure_completion && self.metrics.turn_count >= self.config.max_turns {
            if let Some(transition) = self.phases.force_closing() {
                self.on_transition(transition);
            }
        }

        if self.phases.phase().is_terminal() {
            let outcome = self.computed_outcome();
            self.finish(outcome);
            return Ok(());
        }

        let speaker = self.current;
        let agent = match speaker {
            Speaker::SideA => Arc::clone(&self.side_a),
            Speaker::SideB => Arc::clone(&self.side_b),
        };
        let message = agent.respond(&self.transcript).await.map_err(|err| {
            error!(
                speaker = %speaker,
                turn = self.metrics.turn_count,
                error = %err,
                "Agent failed to respond"
            );
            err
        })?;

        let phase = self.phases.phase();
        self.metrics
            .update(&message, speaker, &self.config.engagement);
        let record = TurnRecord::new(speaker, message, phase);
        self.log_turn(&record);
        self.transcript.push(record.clone());
        self.phases.record_turn();

        self.pending.push_back(ConversationEvent::Turn {
            turn: self.metrics.turn_count,
            record,
            side_a_engagement: self.metrics.side_a_engagement,
            side_b_engagement: self.metrics.side_b_engagement,
        });

        match self.termination() {
            Some(outcome) => self.finish(outcome),
            None => self.current = speaker.other(),
        }
        Ok(())
    }

    /// Termination rules, hard machinery first and engagement heuristics last.
    fn termination(&self) -> Option<Outcome> {
        let turns = self.metrics.turn_count;

        if self.phases.phase().is_terminal() {
            return Some(self.computed_outcome());
        }

        if self.config.ensure_completion {
            if self.phases.closing_complete() || turns >= self.hard_max_turns {
                return Some(self.computed_outcome());
            }
        } else if turns >= self.config.max_turns {
            return Some(Outcome::FollowUpLater);
        }

        if turns >= self.config.min_turns {
            return self.config.early_exit.check(
                self.metrics.side_a_engagement,
                self.metrics.side_b_engagement,
            );
        }

        None
    }

    fn computed_outcome(&self) -> Outcome {
        self.config.outcome_thresholds.compute(
            self.metrics.side_a_engagement,
            self.metrics.side_b_engagement,
        )
    }

    fn on_transition(&mut self, transition: PhaseTransition) {
        info!(
            from = %transition.from,
            to = %transition.to,
            forced = transition.forced,
            turn = self.metrics.turn_count,
            "Phase transition"
        );
        self.pending
            .push_back(ConversationEvent::PhaseChanged(transition));
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.state = RunState::Finished;
        info!(
            run_id = %self.run_id,
            outcome = %outcome,
            turns = self.metrics.turn_count,
            side_a = format!("{:.2}", self.metrics.side_a_engagement),
            side_b = format!("{:.2}", self.metrics.side_b_engagement),
            "Conversation ended"
        );
        self.pending.push_back(ConversationEvent::Ended {
            outcome,
            turns: self.metrics.turn_count,
            final_metrics: self.metrics.clone(),
        });
    }

    fn log_turn(&self, record: &TurnRecord) {
        info!(
            speaker = %record.speaker,
            phase = %record.phase_at_time,
            turn = self.metrics.turn_count,
            side_a = format!("{:.2}", self.metrics.side_a_engagement),
            side_b = format!("{:.2}", self.metrics.side_b_engagement),
            message = %snippet(&record.message),
            "Conversation turn"
        );
        debug!(chars = record.message.len(), "Turn length");
    }
}

/// Single-line preview of a message, capped in length.
fn snippet(text: &str) -> String {
    let mut cut: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        cut.push_str("...");
    }
    cut.split_whitespace().collect::<Vec<_>>().join(" ")
}
