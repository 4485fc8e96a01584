//! Shared types used across debate modules
//!
//! Contains chat messages, questions, agent identities, turns, transcripts,
//! round contexts and debate results.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Backend serving a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Local Ollama server
    Ollama,
    /// Hosted OpenAI-compatible chat completions endpoint
    Api,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::Api => write!(f, "api"),
        }
    }
}

/// A benchmark question. Read once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Dataset id; numeric ids are read as their decimal text
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Question text
    #[serde(alias = "question")]
    pub text: String,
    /// Supporting passage (BoolQ-style tasks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    /// Answer choices for multiple-choice tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Gold answer, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<serde_json::Value>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got {}",
            other
        ))),
    }
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            passage: None,
            choices: None,
            answer: None,
        }
    }

    pub fn with_passage(mut self, passage: impl Into<String>) -> Self {
        self.passage = Some(passage.into());
        self
    }

    /// Gold answer normalised to a lowercase label (`true`, `false`, ...)
    pub fn answer_label(&self) -> Option<String> {
        match self.answer.as_ref()? {
            serde_json::Value::Bool(b) => Some(b.to_string()),
            serde_json::Value::String(s) => Some(s.trim().to_lowercase()),
            other => Some(other.to_string()),
        }
    }
}

/// Stable identity of one debate participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Canonical slot, unique within a debate
    pub index: usize,
    pub provider: ProviderType,
    pub model: String,
    /// Role label shown in logs and reports
    pub role: String,
}

impl std::fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent {} ({})", self.index, self.model)
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Text was produced and an answer extracted
    Parsed,
    /// Text was produced but no answer could be extracted
    Unparseable,
    /// No text: the provider call failed or was cancelled
    Failed,
}

/// One agent's recorded response within one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub agent: AgentIdentity,
    /// 1-based round number
    pub round: usize,
    pub text: String,
    pub answer: Option<String>,
    pub status: TurnStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Turn {
    /// Build a turn from generated text and the parser's verdict
    pub fn answered(
        agent: AgentIdentity,
        round: usize,
        text: impl Into<String>,
        answer: Option<String>,
    ) -> Self {
        let status = if answer.is_some() {
            TurnStatus::Parsed
        } else {
            TurnStatus::Unparseable
        };
        Self {
            agent,
            round,
            text: text.into(),
            answer,
            status,
            error: None,
        }
    }

    /// Sentinel turn for an agent whose call failed
    pub fn failed(agent: AgentIdentity, round: usize, error: impl Into<String>) -> Self {
        Self {
            agent,
            round,
            text: String::new(),
            answer: None,
            status: TurnStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == TurnStatus::Failed
    }

    pub fn is_parsed(&self) -> bool {
        self.status == TurnStatus::Parsed
    }
}

/// Append-only record of every turn in a debate, round by round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    agent_count: usize,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(agent_count: usize) -> Self {
        Self {
            agent_count,
            turns: Vec::new(),
        }
    }

    /// Append one full round. Each round must supply exactly one turn per agent.
    pub fn push_round(&mut self, turns: &[Turn]) {
        debug_assert_eq!(turns.len(), self.agent_count);
        self.turns.extend_from_slice(turns);
    }

    /// Number of rounds recorded
    pub fn rounds(&self) -> usize {
        if self.agent_count == 0 {
            0
        } else {
            self.turns.len() / self.agent_count
        }
    }

    /// Turns of a 1-based round
    pub fn round(&self, round: usize) -> &[Turn] {
        if round == 0 || round > self.rounds() {
            return &[];
        }
        let start = (round - 1) * self.agent_count;
        &self.turns[start..start + self.agent_count]
    }

    pub fn last_round(&self) -> &[Turn] {
        self.round(self.rounds())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// What one agent shared with its peers in the previous round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerView {
    pub agent_index: usize,
    /// Full response or answer-only summary, per the sharing policy
    pub content: String,
}

/// Material used to prompt every agent for one round
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub question: Arc<Question>,
    /// 1-based round number
    pub round: usize,
    /// Peer outputs of the previous round (empty in round 1)
    pub peers: Vec<PeerView>,
}

impl RoundContext {
    /// Round 1 context: the question alone
    pub fn initial(question: Arc<Question>) -> Self {
        Self {
            question,
            round: 1,
            peers: Vec::new(),
        }
    }

    /// Peers visible to one agent (its own previous output is excluded)
    pub fn peers_for(&self, agent_index: usize) -> Vec<&PeerView> {
        self.peers
            .iter()
            .filter(|p| p.agent_index != agent_index)
            .collect()
    }
}

/// Why the debate loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Converged,
    MaxRoundsReached,
    Aborted,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Converged => write!(f, "converged"),
            TerminationReason::MaxRoundsReached => write!(f, "max_rounds_reached"),
            TerminationReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// What caused an aborted debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortCause {
    RoundFailure,
    Timeout,
}

/// Final answer of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub agent_index: usize,
    pub model: String,
    pub answer: Option<String>,
    pub status: TurnStatus,
}

/// Aggregated outcome of one debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateResult {
    pub question_id: String,
    /// Aggregated answer; `None` when inconclusive
    pub answer: Option<String>,
    pub agent_answers: Vec<AgentAnswer>,
    /// Vote weight per answer label
    pub votes: BTreeMap<String, f64>,
    pub rounds_run: usize,
    pub reason: TerminationReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_cause: Option<AbortCause>,
    /// No usable answer was available
    pub inconclusive: bool,
    /// Some agents failed or the debate was aborted
    pub partial_failure: bool,
    /// A judge model decided the answer
    #[serde(default)]
    pub judged: bool,
}

impl DebateResult {
    /// Compare the aggregated answer against the question's gold answer
    pub fn is_correct(&self, question: &Question) -> Option<bool> {
        let gold = question.answer_label()?;
        Some(self.answer.as_deref() == Some(gold.as_str()))
    }
}

/// Result plus the complete transcript, handed to the reporting collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub result: DebateResult,
    pub transcript: Transcript,
}
