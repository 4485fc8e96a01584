//! Debate controller
//!
//! Owns one debate from the first round to the aggregated result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::{build_agents, DebateAgent};
use crate::core::config::{Config, ContextSharing, DebateConfig};
use crate::core::{
    AbortCause, DebateError, DebateOutcome, Question, Result, RoundContext, TerminationReason,
    Transcript,
};
use crate::debate::aggregator::{next_round_context, Aggregator, RunSummary};
use crate::debate::convergence::{policy_from_config, ConvergencePolicy};
use crate::debate::round::{RoundCoordinator, RoundOutcome};
use crate::debate::state::{DebateLoopState, DebateState};
use crate::llm::{AnswerParser, PromptBuilder, ProviderRegistry};

/// Runs a single debate over a fixed set of agents
pub struct DebateController {
    question: Arc<Question>,
    agents: Vec<DebateAgent>,
    coordinator: RoundCoordinator,
    convergence: Box<dyn ConvergencePolicy>,
    aggregator: Aggregator,
    context_sharing: ContextSharing,
    max_rounds: usize,
    timeout: Option<Duration>,
    transcript: Transcript,
    state: DebateState,
}

impl DebateController {
    /// Validate the debate setup. Agents must carry indices `0..n` in order.
    pub fn new(
        config: &DebateConfig,
        question: Question,
        agents: Vec<DebateAgent>,
        aggregator: Aggregator,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(DebateError::config("a debate needs at least one agent"));
        }
        if config.max_rounds == 0 {
            return Err(DebateError::config("max_rounds must be at least 1"));
        }
        if config.max_workers == 0 {
            return Err(DebateError::config("max_workers must be at least 1"));
        }
        if !(0.0..=1.0).contains(&config.failure_tolerance) {
            return Err(DebateError::config(format!(
                "failure_tolerance {} is outside 0.0..=1.0",
                config.failure_tolerance
            )));
        }
        let mut seen = HashSet::new();
        for (slot, agent) in agents.iter().enumerate() {
            if agent.index() != slot || !seen.insert(agent.index()) {
                return Err(DebateError::config(format!(
                    "agent at slot {} has index {}; indices must be 0..{}",
                    slot,
                    agent.index(),
                    agents.len()
                )));
            }
        }
        if let Some(k) = config.convergence_threshold {
            if k == 0 || k > agents.len() {
                return Err(DebateError::config(format!(
                    "convergence_threshold {} is outside 1..={}",
                    k,
                    agents.len()
                )));
            }
        }

        Ok(Self {
            question: Arc::new(question),
            transcript: Transcript::new(agents.len()),
            agents,
            coordinator: RoundCoordinator::from_config(config),
            convergence: policy_from_config(config.convergence_threshold),
            aggregator,
            context_sharing: config.context_sharing,
            max_rounds: config.max_rounds,
            timeout: config.timeout_seconds.map(Duration::from_secs),
            state: DebateState::Init,
        })
    }

    /// Build agents and aggregator for `question` from the full configuration
    pub fn from_config(
        config: &Config,
        registry: &ProviderRegistry,
        question: Question,
        prompts: Arc<dyn PromptBuilder>,
        parser: Arc<dyn AnswerParser>,
    ) -> Result<Self> {
        let agents = build_agents(config, registry, prompts, parser)?;
        let aggregator = Aggregator::from_config(config, registry)?;
        Self::new(&config.debate, question, agents, aggregator)
    }

    /// Replace the whole-debate timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn transition(&mut self, next: DebateState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(question = %self.question.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// Run the debate to completion
    pub async fn run(mut self) -> DebateOutcome {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut loop_state = DebateLoopState::new(self.max_rounds);
        let mut context = RoundContext::initial(self.question.clone());

        info!(
            question = %self.question.id,
            agents = self.agents.len(),
            max_rounds = self.max_rounds,
            convergence = self.convergence.name(),
            "debate started"
        );

        let (reason, abort_cause, final_round) = loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                if let Some(last) = loop_state.last_successful_round {
                    warn!(question = %self.question.id, round = last, "debate deadline passed between rounds");
                    self.transition(DebateState::Aborted(AbortCause::Timeout));
                    break (TerminationReason::Aborted, Some(AbortCause::Timeout), last);
                }
            }

            let round = loop_state.next_round();
            self.transition(DebateState::RoundInProgress { round });

            match self
                .coordinator
                .run_round_until(&mut self.agents, &context, deadline)
                .await
            {
                RoundOutcome::Completed(turns) => {
                    self.transcript.push_round(&turns);
                    loop_state.mark_successful();

                    if self.convergence.converged(&turns) {
                        info!(question = %self.question.id, round, "debate converged");
                        self.transition(DebateState::Converged);
                        break (TerminationReason::Converged, None, round);
                    }
                    if loop_state.at_ceiling() {
                        self.transition(DebateState::MaxRoundsReached);
                        break (TerminationReason::MaxRoundsReached, None, round);
                    }

                    context = next_round_context(
                        self.question.clone(),
                        round + 1,
                        &turns,
                        self.context_sharing,
                    );
                }
                RoundOutcome::Failed(failure) => {
                    warn!(question = %self.question.id, error = %failure, "aborting debate");
                    self.transcript.push_round(&failure.turns);
                    self.transition(DebateState::Aborted(AbortCause::RoundFailure));
                    let source = loop_state.last_successful_round.unwrap_or(round);
                    break (TerminationReason::Aborted, Some(AbortCause::RoundFailure), source);
                }
                RoundOutcome::TimedOut(turns) => {
                    warn!(question = %self.question.id, round, "debate timed out");
                    self.transcript.push_round(&turns);
                    self.transition(DebateState::Aborted(AbortCause::Timeout));
                    let usable = turns.iter().any(|t| t.is_parsed());
                    let source = match loop_state.last_successful_round {
                        Some(last) if !usable => last,
                        _ => round,
                    };
                    break (TerminationReason::Aborted, Some(AbortCause::Timeout), source);
                }
            }
        };

        self.transition(DebateState::Aggregating);
        let summary = RunSummary {
            question_id: self.question.id.clone(),
            rounds_run: self.transcript.rounds(),
            reason,
            abort_cause,
        };
        let final_turns = self.transcript.round(final_round).to_vec();
        let result = self
            .aggregator
            .aggregate(&self.question, &final_turns, &summary)
            .await;
        self.transition(DebateState::Done);

        info!(
            question = %self.question.id,
            answer = result.answer.as_deref().unwrap_or("<inconclusive>"),
            rounds = result.rounds_run,
            reason = %result.reason,
            "debate finished"
        );

        DebateOutcome {
            result,
            transcript: self.transcript,
        }
    }
}
