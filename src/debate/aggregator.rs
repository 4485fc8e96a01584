//! Answer aggregation
//!
//! Reduces the final round's turns to one decision, by (weighted) majority
//! vote or by asking a judge model.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::{AggregationMode, Config, ContextSharing};
use crate::core::{
    AbortCause, AgentAnswer, DebateResult, PeerView, Question, Result, RoundContext,
    TerminationReason, Turn,
};
use crate::debate::convergence::{ConvergencePolicy, Unanimous};
use crate::llm::prompts::judge_prompt;
use crate::llm::{AnswerParser, BoolAnswerParser, ModelClient, ProviderRegistry};

/// Shown to peers in answers-only mode when a turn had no parsed answer
const NO_CLEAR_ANSWER: &str = "no clear answer";

/// How the debate loop ended, carried into the result
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub question_id: String,
    pub rounds_run: usize,
    pub reason: TerminationReason,
    pub abort_cause: Option<AbortCause>,
}

/// Vote tally over one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub votes: BTreeMap<String, f64>,
    /// Winning answer, ties broken toward the lowest agent index
    pub winner: Option<String>,
}

/// Count parsed answers, weighting each by `weights[agent.index]` (1.0 if absent).
pub fn tally(turns: &[Turn], weights: &[f64]) -> Tally {
    // answer -> (weight, lowest agent index that gave it)
    let mut scores: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for turn in turns.iter().filter(|t| t.is_parsed()) {
        let Some(ref answer) = turn.answer else { continue };
        let weight = weights.get(turn.agent.index).copied().unwrap_or(1.0);
        let entry = scores.entry(answer.as_str()).or_insert((0.0, turn.agent.index));
        entry.0 += weight;
        entry.1 = entry.1.min(turn.agent.index);
    }

    let winner = scores
        .iter()
        .max_by(|(_, (wa, ia)), (_, (wb, ib))| {
            wa.partial_cmp(wb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ib.cmp(ia))
        })
        .map(|(answer, _)| answer.to_string());

    Tally {
        votes: scores.into_iter().map(|(a, (w, _))| (a.to_string(), w)).collect(),
        winner,
    }
}

/// Plain one-agent-one-vote majority over a round
pub fn majority(turns: &[Turn]) -> Option<String> {
    tally(turns, &[]).winner
}

/// Peer material for the next round under the given sharing policy.
///
/// Failed turns are not shared.
pub fn next_round_context(
    question: Arc<Question>,
    round: usize,
    previous: &[Turn],
    sharing: ContextSharing,
) -> RoundContext {
    let peers = previous
        .iter()
        .filter(|t| !t.is_failed())
        .map(|t| PeerView {
            agent_index: t.agent.index,
            content: match sharing {
                ContextSharing::Full => t.text.clone(),
                ContextSharing::AnswersOnly => t
                    .answer
                    .clone()
                    .unwrap_or_else(|| NO_CLEAR_ANSWER.to_string()),
            },
        })
        .collect();

    RoundContext {
        question,
        round,
        peers,
    }
}

/// Judge model plus the parser applied to its verdict
pub struct Judge {
    client: ModelClient,
    parser: Arc<dyn AnswerParser>,
}

impl Judge {
    pub fn new(client: ModelClient, parser: Arc<dyn AnswerParser>) -> Self {
        Self { client, parser }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

/// Reduces final turns to a [`DebateResult`]
pub struct Aggregator {
    mode: AggregationMode,
    weights: Vec<f64>,
    judge: Option<Judge>,
}

impl Aggregator {
    /// Unweighted majority vote
    pub fn majority() -> Self {
        Self {
            mode: AggregationMode::Majority,
            weights: Vec::new(),
            judge: None,
        }
    }

    /// Majority vote weighted per agent index
    pub fn weighted(weights: Vec<f64>) -> Self {
        Self {
            mode: AggregationMode::Weighted,
            weights,
            judge: None,
        }
    }

    /// Judge decides disagreements, majority is the fallback
    pub fn judged(judge: Judge) -> Self {
        Self {
            mode: AggregationMode::Judge,
            weights: Vec::new(),
            judge: Some(judge),
        }
    }

    /// Aggregator for the configured mode; judge mode resolves its provider here
    pub fn from_config(config: &Config, registry: &ProviderRegistry) -> Result<Self> {
        match config.debate.aggregation_mode {
            AggregationMode::Majority => Ok(Self::majority()),
            AggregationMode::Weighted => Ok(Self::weighted(config.agent_weights())),
            AggregationMode::Judge => {
                let judge = config.debate.judge.as_ref().ok_or_else(|| {
                    crate::core::DebateError::config("judge aggregation requires [debate.judge]")
                })?;
                let provider = registry.resolve(judge.provider)?;
                let client = ModelClient::new(provider, judge.model_name.clone(), &config.generation);
                Ok(Self::judged(Judge::new(client, Arc::new(BoolAnswerParser))))
            }
        }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Vote over `turns` without any model call
    pub fn vote(&self, turns: &[Turn], summary: &RunSummary) -> DebateResult {
        let weights: &[f64] = match self.mode {
            AggregationMode::Weighted => &self.weights,
            _ => &[],
        };
        let Tally { votes, winner } = tally(turns, weights);

        let agent_answers = turns
            .iter()
            .map(|t| AgentAnswer {
                agent_index: t.agent.index,
                model: t.agent.model.clone(),
                answer: t.answer.clone(),
                status: t.status,
            })
            .collect();

        DebateResult {
            question_id: summary.question_id.clone(),
            inconclusive: winner.is_none(),
            answer: winner,
            agent_answers,
            votes,
            rounds_run: summary.rounds_run,
            reason: summary.reason,
            abort_cause: summary.abort_cause,
            partial_failure: summary.reason == TerminationReason::Aborted
                || turns.iter().any(|t| t.is_failed()),
            judged: false,
        }
    }

    /// Aggregate the final turns.
    ///
    /// The judge is consulted unless every final turn parsed to the same
    /// answer; it needs at least one parsed answer to rule on.
    pub async fn aggregate(
        &self,
        question: &Question,
        turns: &[Turn],
        summary: &RunSummary,
    ) -> DebateResult {
        let mut result = self.vote(turns, summary);

        if let Some(ref judge) = self.judge {
            if !result.votes.is_empty() && !Unanimous.converged(turns) {
                match self.ask_judge(judge, question, turns).await {
                    Some(answer) => {
                        info!(judge = judge.model(), answer = %answer, "judge decided");
                        result.answer = Some(answer);
                        result.judged = true;
                    }
                    None => {
                        warn!(judge = judge.model(), "judge gave no usable verdict, using majority");
                    }
                }
            }
        }

        result
    }

    async fn ask_judge(&self, judge: &Judge, question: &Question, turns: &[Turn]) -> Option<String> {
        let answers: Vec<(usize, &str, &str)> = turns
            .iter()
            .filter(|t| t.is_parsed())
            .filter_map(|t| Some((t.agent.index, t.answer.as_deref()?, t.text.as_str())))
            .collect();
        let prompt = judge_prompt(question, &answers);

        match judge.client.generate(&prompt).await {
            Ok(text) => judge.parser.parse(&text),
            Err(err) => {
                warn!(judge = judge.model(), error = %err, "judge call failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AgentIdentity, ProviderType};

    fn turn(index: usize, answer: Option<&str>) -> Turn {
        let agent = AgentIdentity {
            index,
            provider: ProviderType::Ollama,
            model: format!("model-{}", index),
            role: "debater".to_string(),
        };
        Turn::answered(agent, 1, format!("reasoning {}", index), answer.map(str::to_string))
    }

    fn summary(reason: TerminationReason) -> RunSummary {
        RunSummary {
            question_id: "q1".to_string(),
            rounds_run: 2,
            reason,
            abort_cause: None,
        }
    }

    #[test]
    fn test_majority_wins() {
        let turns = vec![turn(0, Some("true")), turn(1, Some("false")), turn(2, Some("true"))];
        assert_eq!(majority(&turns).as_deref(), Some("true"));

        let result = Aggregator::majority().vote(&turns, &summary(TerminationReason::MaxRoundsReached));
        assert_eq!(result.answer.as_deref(), Some("true"));
        assert_eq!(result.votes["true"], 2.0);
        assert_eq!(result.votes["false"], 1.0);
        assert!(!result.inconclusive);
        assert!(!result.partial_failure);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let turns = vec![turn(0, Some("false")), turn(1, Some("true"))];
        assert_eq!(majority(&turns).as_deref(), Some("false"));

        let turns = vec![turn(0, Some("true")), turn(1, Some("false"))];
        assert_eq!(majority(&turns).as_deref(), Some("true"));
    }

    #[test]
    fn test_weighted_vote() {
        let turns = vec![turn(0, Some("true")), turn(1, Some("true")), turn(2, Some("false"))];
        let result = Aggregator::weighted(vec![1.0, 1.0, 3.0])
            .vote(&turns, &summary(TerminationReason::MaxRoundsReached));
        assert_eq!(result.answer.as_deref(), Some("false"));
        assert_eq!(result.votes["false"], 3.0);
    }

    #[test]
    fn test_only_parsed_turns_vote() {
        let failed = Turn::failed(turn(2, None).agent, 1, "timeout");
        let turns = vec![turn(0, None), turn(1, Some("false")), failed];
        let result = Aggregator::majority().vote(&turns, &summary(TerminationReason::MaxRoundsReached));
        assert_eq!(result.answer.as_deref(), Some("false"));
        assert_eq!(result.votes.len(), 1);
        assert!(result.partial_failure);
        assert_eq!(result.agent_answers.len(), 3);
    }

    #[test]
    fn test_inconclusive_without_parsed_answers() {
        let turns = vec![turn(0, None), turn(1, None)];
        let result = Aggregator::majority().vote(&turns, &summary(TerminationReason::MaxRoundsReached));
        assert!(result.inconclusive);
        assert!(result.answer.is_none());
        assert!(result.votes.is_empty());
    }

    #[test]
    fn test_aborted_is_partial_failure() {
        let turns = vec![turn(0, Some("true"))];
        let result = Aggregator::majority().vote(&turns, &summary(TerminationReason::Aborted));
        assert!(result.partial_failure);
    }

    #[test]
    fn test_next_round_context_full() {
        let question = Arc::new(Question::new("q1", "?"));
        let failed = Turn::failed(turn(2, None).agent, 1, "boom");
        let previous = vec![turn(0, Some("true")), turn(1, None), failed];

        let ctx = next_round_context(question, 2, &previous, ContextSharing::Full);
        assert_eq!(ctx.round, 2);
        assert_eq!(ctx.peers.len(), 2);
        assert_eq!(ctx.peers[0].content, "reasoning 0");
        assert_eq!(ctx.peers[1].content, "reasoning 1");
    }

    #[test]
    fn test_next_round_context_answers_only() {
        let question = Arc::new(Question::new("q1", "?"));
        let previous = vec![turn(0, Some("true")), turn(1, None)];

        let ctx = next_round_context(question, 2, &previous, ContextSharing::AnswersOnly);
        assert_eq!(ctx.peers[0].content, "true");
        assert_eq!(ctx.peers[1].content, NO_CLEAR_ANSWER);
    }
}
