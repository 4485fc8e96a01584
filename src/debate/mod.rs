//! Debate engine: rounds, convergence, aggregation and the controller that
//! drives them.

pub mod aggregator;
pub mod controller;
pub mod convergence;
pub mod round;
pub mod state;

pub use aggregator::{majority, next_round_context, tally, Aggregator, Judge, RunSummary, Tally};
pub use controller::DebateController;
pub use convergence::{policy_from_config, ConvergencePolicy, Threshold, Unanimous};
pub use round::{RoundCoordinator, RoundOutcome, CANCELLED};
pub use state::{DebateLoopState, DebateState};
