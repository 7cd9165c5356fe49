//! Phase state machine for a single conversation.
//!
//! Holds the current phase and the closing-turn counter. Advancement is a
//! pure function of the transcript's phase tags and the current phase.

use serde::{Deserialize, Serialize};

use crate::domain::models::{DwellTargets, Phase, Transcript};

/// A phase change, natural or forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    /// True when the soft turn cap pushed the conversation into `closing`.
    pub forced: bool,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: Phase,
    closing_turns: usize,
    dwell: DwellTargets,
    closing_grace: usize,
    lookback_window: usize,
}

impl PhaseMachine {
    pub fn new(dwell: DwellTargets, closing_grace: usize, lookback_window: usize) -> Self {
        Self {
            phase: Phase::Introduction,
            closing_turns: 0,
            dwell,
            closing_grace: closing_grace.max(1),
            lookback_window,
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn closing_turns(&self) -> usize {
        self.closing_turns
    }

    pub const fn closing_grace(&self) -> usize {
        self.closing_grace
    }

    /// True when the current phase has met its dwell target within the
    /// lookback window.
    pub fn should_advance(&self, transcript: &Transcript) -> bool {
        self.dwell
            .target(self.phase, self.closing_grace)
            .is_some_and(|target| {
                transcript.turns_in_phase(self.phase, self.lookback_window) >= target
            })
    }

    /// Advance if the dwell target is met.
    pub fn step(&mut self, transcript: &Transcript) -> Option<PhaseTransition> {
        if self.should_advance(transcript) {
            Some(self.enter(self.phase.next(), false))
        } else {
            None
        }
    }

    /// Jump straight to `closing`, bypassing dwell targets. No-op when
    /// already closing or ended.
    pub fn force_closing(&mut self) -> Option<PhaseTransition> {
        if self.phase.is_winding_down() {
            None
        } else {
            Some(self.enter(Phase::Closing, true))
        }
    }

    /// Count a produced turn toward the closing grace.
    pub fn record_turn(&mut self) {
        if self.phase == Phase::Closing {
            self.closing_turns += 1;
        }
    }

    /// True once the closing grace has been used up.
    pub fn closing_complete(&self) -> bool {
        self.phase == Phase::Closing && self.closing_turns >= self.closing_grace
    }

    fn enter(&mut self, to: Phase, forced: bool) -> PhaseTransition {
        let from = self.phase;
        self.phase = to;
        if to == Phase::Closing {
            self.closing_turns = 0;
        }
        PhaseTransition { from, to, forced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Speaker, TurnRecord};

    fn transcript_with(phases: &[Phase]) -> Transcript {
        let mut t = Transcript::new();
        for (i, phase) in phases.iter().enumerate() {
            let speaker = if i % 2 == 0 { Speaker::SideA } else { Speaker::SideB };
            t.push(TurnRecord::new(speaker, "msg", *phase));
        }
        t
    }

    #[test]
    fn test_introduction_advances_after_two_turns() {
        let mut m = PhaseMachine::new(DwellTargets::default(), 2, 10);
        let t = transcript_with(&[Phase::Introduction]);
        assert!(m.step(&t).is_none());

        let t = transcript_with(&[Phase::Introduction, Phase::Introduction]);
        let transition = m.step(&t).unwrap();
        assert_eq!(transition.from, Phase::Introduction);
        assert_eq!(transition.to, Phase::Discovery);
        assert!(!transition.forced);
        assert_eq!(m.phase(), Phase::Discovery);
    }

    #[test]
    fn test_lookback_window_limits_count() {
        let mut m = PhaseMachine::new(DwellTargets::default(), 2, 1);
        let t = transcript_with(&[Phase::Introduction, Phase::Discovery]);
        assert!(!m.should_advance(&t));
        assert!(m.step(&t).is_none());
    }

    #[test]
    fn test_force_closing_resets_counter() {
        let mut m = PhaseMachine::new(DwellTargets::default(), 2, 10);
        let t = transcript_with(&[Phase::Introduction, Phase::Introduction]);
        m.step(&t);
        let transition = m.force_closing().unwrap();
        assert!(transition.forced);
        assert_eq!(m.phase(), Phase::Closing);
        assert_eq!(m.closing_turns(), 0);

        m.record_turn();
        assert!(!m.closing_complete());
        m.record_turn();
        assert!(m.closing_complete());
        assert!(m.force_closing().is_none());
    }

    #[test]
    fn test_closing_advances_to_ended_after_grace() {
        let mut m = PhaseMachine::new(DwellTargets::default(), 1, 10);
        m.force_closing();
        let t = transcript_with(&[Phase::Closing]);
        let transition = m.step(&t).unwrap();
        assert_eq!(transition.to, Phase::Ended);
        assert!(m.phase().is_terminal());
        assert!(m.step(&t).is_none());
        assert!(m.force_closing().is_none());
    }

    #[test]
    fn test_grace_floor_is_one() {
        let m = PhaseMachine::new(DwellTargets::default(), 0, 10);
        assert_eq!(m.closing_grace(), 1);
    }
}
