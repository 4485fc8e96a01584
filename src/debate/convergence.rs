//! Convergence policies
//!
//! Checked after every completed round to decide whether the debate can
//! stop early.

use std::collections::HashMap;

use crate::core::Turn;

/// Decides whether a round's answers agree enough to stop
pub trait ConvergencePolicy: Send + Sync {
    fn converged(&self, turns: &[Turn]) -> bool;

    fn name(&self) -> &'static str;
}

/// Every agent produced a parsed answer and all answers are equal
#[derive(Debug, Clone, Copy, Default)]
pub struct Unanimous;

impl ConvergencePolicy for Unanimous {
    fn converged(&self, turns: &[Turn]) -> bool {
        let mut answers = turns.iter().map(|t| t.answer.as_deref().filter(|_| t.is_parsed()));
        match answers.next() {
            Some(Some(first)) => answers.all(|a| a == Some(first)),
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        "unanimous"
    }
}

/// At least `k` agents share one parsed answer
#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    pub k: usize,
}

impl ConvergencePolicy for Threshold {
    fn converged(&self, turns: &[Turn]) -> bool {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for turn in turns.iter().filter(|t| t.is_parsed()) {
            if let Some(ref answer) = turn.answer {
                *counts.entry(answer.as_str()).or_insert(0) += 1;
            }
        }
        counts.values().any(|&c| c >= self.k)
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}

/// Policy selected by `debate.convergence_threshold`
pub fn policy_from_config(threshold: Option<usize>) -> Box<dyn ConvergencePolicy> {
    match threshold {
        Some(k) => Box::new(Threshold { k }),
        None => Box::new(Unanimous),
    }
}
