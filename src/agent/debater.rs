//! Debate agents
//!
//! One model instance taking part in a debate, with its own conversation
//! history and turn transcript.

use std::sync::Arc;

use tracing::debug;

use crate::agent::conversation::Conversation;
use crate::core::{AgentIdentity, Config, ProviderError, Result, RoundContext, Turn};
use crate::llm::{
    AnswerParser, BoolAnswerParser, BoolQPromptBuilder, ModelClient, PromptBuilder,
    ProviderRegistry,
};

/// A single debate participant
pub struct DebateAgent {
    identity: AgentIdentity,
    client: ModelClient,
    conversation: Conversation,
    /// Turns this agent produced, in round order
    transcript: Vec<Turn>,
    prompts: Arc<dyn PromptBuilder>,
    parser: Arc<dyn AnswerParser>,
}

/// Builder for creating DebateAgents
pub struct DebateAgentBuilder {
    identity: AgentIdentity,
    client: ModelClient,
    system_prompt: Option<String>,
    history_token_budget: usize,
    prompts: Option<Arc<dyn PromptBuilder>>,
    parser: Option<Arc<dyn AnswerParser>>,
}

impl DebateAgentBuilder {
    pub fn new(identity: AgentIdentity, client: ModelClient) -> Self {
        Self {
            identity,
            client,
            system_prompt: None,
            history_token_budget: 8000,
            prompts: None,
            parser: None,
        }
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Token budget for the agent's own history
    pub fn history_token_budget(mut self, budget: usize) -> Self {
        self.history_token_budget = budget;
        self
    }

    pub fn prompts(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn AnswerParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Build the DebateAgent
    pub fn build(self) -> DebateAgent {
        let mut conversation = Conversation::new(self.history_token_budget);
        if let Some(prompt) = self.system_prompt {
            conversation.set_system_prompt(prompt);
        }

        DebateAgent {
            identity: self.identity,
            client: self.client,
            conversation,
            transcript: Vec::new(),
            prompts: self
                .prompts
                .unwrap_or_else(|| Arc::new(BoolQPromptBuilder::default())),
            parser: self.parser.unwrap_or_else(|| Arc::new(BoolAnswerParser)),
        }
    }
}

impl DebateAgent {
    /// Create a builder for more control
    pub fn builder(identity: AgentIdentity, client: ModelClient) -> DebateAgentBuilder {
        DebateAgentBuilder::new(identity, client)
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn index(&self) -> usize {
        self.identity.index
    }

    /// Turns produced so far
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Answer one round; an unparseable answer is still a turn
    pub async fn respond(&mut self, context: &RoundContext) -> std::result::Result<Turn, ProviderError> {
        let peers = context.peers_for(self.identity.index);
        let prompt = if context.round <= 1 || peers.is_empty() {
            self.prompts.round_zero(&context.question)
        } else {
            self.prompts.round_n(&context.question, &peers)
        };

        let messages = self.conversation.messages_with(&prompt);
        let text = self.client.generate_messages(&messages).await?;
        let answer = self.parser.parse(&text);

        debug!(
            agent = self.identity.index,
            model = %self.identity.model,
            provider = self.client.provider_name(),
            round = context.round,
            answer = answer.as_deref().unwrap_or("<unparseable>"),
            "agent responded"
        );

        let turn = Turn::answered(self.identity.clone(), context.round, text.clone(), answer);
        self.conversation.add_exchange(prompt, text);
        self.transcript.push(turn.clone());
        Ok(turn)
    }
}

/// Instantiate every configured agent in canonical index order
pub fn build_agents(
    config: &Config,
    registry: &ProviderRegistry,
    prompts: Arc<dyn PromptBuilder>,
    parser: Arc<dyn AnswerParser>,
) -> Result<Vec<DebateAgent>> {
    config
        .agent_identities()
        .into_iter()
        .map(|identity| {
            let provider = registry.resolve(identity.provider)?;
            let client = ModelClient::new(provider, identity.model.clone(), &config.generation);
            Ok(DebateAgent::builder(identity, client)
                .history_token_budget(config.debate.history_token_budget)
                .prompts(prompts.clone())
                .parser(parser.clone())
                .build())
        })
        .collect()
}
