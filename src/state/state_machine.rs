use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// High-level phases a room can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Players are gathering; the quiz has not started yet.
    Lobby,
    /// A question is live and accepting answers.
    Question(QuestionStatus),
    /// Correct answers are displayed and points have been awarded.
    Reveal,
    /// The quiz is over and the winner is displayed.
    Ended,
}

/// Sub-state while a question is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    /// The countdown is running and answers are accepted.
    Running,
    /// The host froze the countdown; answers are rejected.
    Paused,
}

/// Events the host (or the server-side timer acting on its behalf) can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Start the quiz from the lobby, exposing the first question.
    Start,
    /// Freeze the countdown of the live question.
    Pause,
    /// Resume a paused question.
    Resume,
    /// Close the live question, award points, and show correct answers.
    Reveal,
    /// Move from the reveal screen to the next question.
    Next,
    /// Move from the reveal screen of the last question to the final scoreboard.
    Finish,
    /// Abandon the current run and return everyone to the lobby.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: RoomPhase,
        /// Current phase.
        actual: RoomPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: RoomPhase,
    /// Phase the state machine will transition to.
    pub to: RoomPhase,
    /// Event that triggered this transition.
    pub event: RoomEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RoomPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<RoomPhase>,
}

/// State machine implementing the lobby/question/reveal/ended room lifecycle.
///
/// Transitions are two-step: `plan` validates the event against the current
/// phase and reserves the transition, `apply` commits it with compare-and-swap
/// checks on phase and version. Concurrent triggers (a host double-click, or
/// the question timer racing a manual reveal) lose the plan and touch nothing.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoomPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Lobby,
            version: 0,
            pending: None,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine at an arbitrary phase, used when re-hydrating a room
    /// from storage.
    pub fn at_phase(phase: RoomPhase) -> Self {
        Self {
            phase,
            version: 0,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: RoomEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoomPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RoomPhase::Lobby, RoomEvent::Start) => RoomPhase::Question(QuestionStatus::Running),
            (RoomPhase::Question(QuestionStatus::Running), RoomEvent::Pause) => {
                RoomPhase::Question(QuestionStatus::Paused)
            }
            (RoomPhase::Question(QuestionStatus::Paused), RoomEvent::Resume) => {
                RoomPhase::Question(QuestionStatus::Running)
            }
            // The host can reveal a paused question; the timer cannot (it only
            // fires while running).
            (RoomPhase::Question(_), RoomEvent::Reveal) => RoomPhase::Reveal,
            (RoomPhase::Reveal, RoomEvent::Next) => RoomPhase::Question(QuestionStatus::Running),
            (RoomPhase::Reveal, RoomEvent::Finish) => RoomPhase::Ended,
            (RoomPhase::Question(_) | RoomPhase::Reveal | RoomPhase::Ended, RoomEvent::Reset) => {
                RoomPhase::Lobby
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoomStateMachine, event: RoomEvent) -> RoomPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.phase(), RoomPhase::Lobby);
    }

    #[test]
    fn full_happy_path_through_quiz() {
        let mut sm = RoomStateMachine::new();

        assert_eq!(
            apply(&mut sm, RoomEvent::Start),
            RoomPhase::Question(QuestionStatus::Running)
        );
        assert_eq!(apply(&mut sm, RoomEvent::Reveal), RoomPhase::Reveal);
        assert_eq!(
            apply(&mut sm, RoomEvent::Next),
            RoomPhase::Question(QuestionStatus::Running)
        );
        assert_eq!(apply(&mut sm, RoomEvent::Reveal), RoomPhase::Reveal);
        assert_eq!(apply(&mut sm, RoomEvent::Finish), RoomPhase::Ended);
    }

    #[test]
    fn pause_and_resume_wrap_the_running_question() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::Start);

        assert_eq!(
            apply(&mut sm, RoomEvent::Pause),
            RoomPhase::Question(QuestionStatus::Paused)
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::Resume),
            RoomPhase::Question(QuestionStatus::Running)
        );
    }

    #[test]
    fn reveal_is_allowed_while_paused() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::Start);
        apply(&mut sm, RoomEvent::Pause);

        assert_eq!(apply(&mut sm, RoomEvent::Reveal), RoomPhase::Reveal);
    }

    #[test]
    fn ended_only_accepts_reset() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::Start);
        apply(&mut sm, RoomEvent::Reveal);
        apply(&mut sm, RoomEvent::Finish);

        for event in [
            RoomEvent::Start,
            RoomEvent::Pause,
            RoomEvent::Resume,
            RoomEvent::Reveal,
            RoomEvent::Next,
            RoomEvent::Finish,
        ] {
            assert!(sm.plan(event).is_err(), "{event:?} accepted from Ended");
        }

        assert_eq!(apply(&mut sm, RoomEvent::Reset), RoomPhase::Lobby);
    }

    #[test]
    fn reset_is_rejected_in_lobby() {
        let mut sm = RoomStateMachine::new();
        let err = sm.plan(RoomEvent::Reset).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, RoomPhase::Lobby);
                assert_eq!(invalid.event, RoomEvent::Reset);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = RoomStateMachine::new();
        let err = sm.plan(RoomEvent::Reveal).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, RoomPhase::Lobby);
                assert_eq!(invalid.event, RoomEvent::Reveal);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn second_plan_fails_while_one_is_pending() {
        let mut sm = RoomStateMachine::new();
        let _plan = sm.plan(RoomEvent::Start).unwrap();
        assert_eq!(sm.plan(RoomEvent::Start).unwrap_err(), PlanError::AlreadyPending);
    }

    #[test]
    fn unapplied_plan_leaves_phase_and_version_unchanged() {
        let mut sm = RoomStateMachine::new();
        let before = sm.snapshot();
        let plan = sm.plan(RoomEvent::Start).unwrap();
        sm.abort(plan.id).unwrap();

        let after = sm.snapshot();
        assert_eq!(before.phase, after.phase);
        assert_eq!(before.version, after.version);
        assert!(after.pending.is_none());
    }

    #[test]
    fn apply_with_wrong_id_keeps_plan_pending() {
        let mut sm = RoomStateMachine::new();
        let plan = sm.plan(RoomEvent::Start).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        // The original plan can still be applied.
        assert_eq!(
            sm.apply(plan.id).unwrap(),
            RoomPhase::Question(QuestionStatus::Running)
        );
    }
}
