//! Round coordination
//!
//! Runs every agent once for a round with bounded concurrency, converts
//! provider failures into failed turns and enforces the failure tolerance.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::DebateAgent;
use crate::core::config::DebateConfig;
use crate::core::{RoundContext, RoundFailure, Turn};

/// Error text recorded for turns cut off by the debate deadline
pub const CANCELLED: &str = "cancelled";

/// How a round ended
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Every agent answered or failed within tolerance
    Completed(Vec<Turn>),
    /// More agents failed than tolerated
    Failed(RoundFailure),
    /// The deadline passed; unfinished slots hold cancelled turns
    TimedOut(Vec<Turn>),
}

/// Dispatches one round of agent calls
#[derive(Debug, Clone)]
pub struct RoundCoordinator {
    max_workers: usize,
    failure_tolerance: f64,
    job_delay: Duration,
}

impl RoundCoordinator {
    pub fn new(max_workers: usize, failure_tolerance: f64) -> Self {
        Self {
            max_workers: max_workers.max(1),
            failure_tolerance,
            job_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &DebateConfig) -> Self {
        Self::new(config.max_workers, config.failure_tolerance)
            .with_job_delay(Duration::from_millis(config.job_delay_ms))
    }

    /// Start slot `i` no earlier than `i * delay` after the round begins
    pub fn with_job_delay(mut self, delay: Duration) -> Self {
        self.job_delay = delay;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run one round without a deadline
    pub async fn run_round(
        &self,
        agents: &mut [DebateAgent],
        context: &RoundContext,
    ) -> Result<Vec<Turn>, RoundFailure> {
        match self.run_round_until(agents, context, None).await {
            RoundOutcome::Completed(turns) | RoundOutcome::TimedOut(turns) => Ok(turns),
            RoundOutcome::Failed(failure) => Err(failure),
        }
    }

    /// Run one round, cancelling outstanding calls once `deadline` passes.
    ///
    /// Turns come back in canonical agent order regardless of completion order.
    pub async fn run_round_until(
        &self,
        agents: &mut [DebateAgent],
        context: &RoundContext,
        deadline: Option<Instant>,
    ) -> RoundOutcome {
        let total = agents.len();
        let round = context.round;
        let identities: Vec<_> = agents.iter().map(|a| a.identity().clone()).collect();
        let mut slots: Vec<Option<Turn>> = vec![None; total];
        let mut timed_out = false;

        info!(round, agents = total, workers = self.max_workers, "round started");

        {
            let job_delay = self.job_delay;
            let started = Instant::now();
            let mut pending = std::pin::pin!(stream::iter(agents.iter_mut().enumerate())
                .map(move |(slot, agent)| async move {
                    // stagger is measured from the round start, not from when a worker frees up
                    if !job_delay.is_zero() && slot > 0 {
                        tokio::time::sleep_until(started + job_delay * slot as u32).await;
                    }
                    (slot, agent.respond(context).await)
                })
                .buffer_unordered(self.max_workers));

            loop {
                let next = match deadline {
                    // finished calls win a tie with the deadline
                    Some(deadline) => tokio::select! {
                        biased;
                        next = pending.next() => next,
                        _ = tokio::time::sleep_until(deadline) => {
                            timed_out = true;
                            None
                        }
                    },
                    None => pending.next().await,
                };

                let Some((slot, result)) = next else { break };
                slots[slot] = Some(match result {
                    Ok(turn) => turn,
                    Err(err) => {
                        warn!(round, agent = slot, error = %err, "agent call failed");
                        Turn::failed(identities[slot].clone(), round, err.to_string())
                    }
                });
            }
            // in-flight calls are dropped here
        }

        let turns: Vec<Turn> = slots
            .into_iter()
            .zip(identities)
            .map(|(slot, identity)| slot.unwrap_or_else(|| Turn::failed(identity, round, CANCELLED)))
            .collect();
        let failed = turns.iter().filter(|t| t.is_failed()).count();

        if timed_out {
            warn!(round, failed, total, "round cut off by debate deadline");
            return RoundOutcome::TimedOut(turns);
        }

        if total > 0 && failed as f64 / total as f64 > self.failure_tolerance {
            warn!(round, failed, total, tolerance = self.failure_tolerance, "round exceeded failure tolerance");
            return RoundOutcome::Failed(RoundFailure {
                round,
                failed,
                total,
                turns,
            });
        }

        debug!(round, failed, total, "round completed");
        RoundOutcome::Completed(turns)
    }
}

impl Default for RoundCoordinator {
    fn default() -> Self {
        Self::from_config(&DebateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = DebateConfig {
            max_workers: 2,
            failure_tolerance: 0.25,
            job_delay_ms: 150,
            ..Default::default()
        };
        let coordinator = RoundCoordinator::from_config(&config);
        assert_eq!(coordinator.max_workers(), 2);
        assert_eq!(coordinator.job_delay, Duration::from_millis(150));
        assert_eq!(coordinator.failure_tolerance, 0.25);
    }

    #[test]
    fn test_zero_workers_clamped() {
        assert_eq!(RoundCoordinator::new(0, 0.5).max_workers(), 1);
    }

    #[tokio::test]
    async fn test_empty_round() {
        let ctx = RoundContext::initial(std::sync::Arc::new(crate::core::Question::new("q", "?")));
        let turns = RoundCoordinator::default().run_round(&mut [], &ctx).await.unwrap();
        assert!(turns.is_empty());
    }
}
