//! Debate state machine
//!
//! `Init → RoundInProgress → (Converged | MaxRoundsReached | Aborted) →
//! Aggregating → Done`

use serde::{Deserialize, Serialize};

use crate::core::AbortCause;

/// State of one debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebateState {
    Init,
    /// 1-based round currently running
    RoundInProgress { round: usize },
    Converged,
    MaxRoundsReached,
    Aborted(AbortCause),
    Aggregating,
    Done,
}

impl DebateState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &DebateState) -> bool {
        use DebateState::*;
        match (self, next) {
            (Init, RoundInProgress { round: 1 }) => true,
            (RoundInProgress { round: a }, RoundInProgress { round: b }) => *b == a + 1,
            (RoundInProgress { .. }, Converged | MaxRoundsReached | Aborted(_)) => true,
            (Converged | MaxRoundsReached | Aborted(_), Aggregating) => true,
            (Aggregating, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DebateState::Done)
    }
}

impl std::fmt::Display for DebateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebateState::Init => write!(f, "init"),
            DebateState::RoundInProgress { round } => write!(f, "round_in_progress({})", round),
            DebateState::Converged => write!(f, "converged"),
            DebateState::MaxRoundsReached => write!(f, "max_rounds_reached"),
            DebateState::Aborted(AbortCause::RoundFailure) => write!(f, "aborted(round_failure)"),
            DebateState::Aborted(AbortCause::Timeout) => write!(f, "aborted(timeout)"),
            DebateState::Aggregating => write!(f, "aggregating"),
            DebateState::Done => write!(f, "done"),
        }
    }
}

/// Round bookkeeping for the debate loop
#[derive(Debug, Clone)]
pub struct DebateLoopState {
    /// Rounds completed so far
    pub round: usize,
    /// Maximum allowed rounds
    pub max_rounds: usize,
    /// Last round that completed within tolerance
    pub last_successful_round: Option<usize>,
}

impl DebateLoopState {
    pub fn new(max_rounds: usize) -> Self {
        Self {
            round: 0,
            max_rounds,
            last_successful_round: None,
        }
    }

    /// Whether the round ceiling has been hit
    pub fn at_ceiling(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Increment the round counter, returning the new round number
    pub fn next_round(&mut self) -> usize {
        self.round += 1;
        self.round
    }

    pub fn mark_successful(&mut self) {
        self.last_successful_round = Some(self.round);
    }
}
