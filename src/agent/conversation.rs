//! Conversation history management
//!
//! Keeps an agent's prompt/response history across rounds, trimmed from the
//! oldest exchange whenever the estimated token count exceeds the budget.

use std::collections::VecDeque;

use crate::core::Message;

/// Rough chars-per-token ratio used for budget estimates
const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count of a text
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Manages conversation history
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Message history
    messages: VecDeque<Message>,
    /// Token budget for history (excluding the pending prompt)
    token_budget: usize,
    /// System prompt (always first)
    system_prompt: Option<String>,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(token_budget: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            token_budget,
            system_prompt: None,
        }
    }

    /// Set the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// Record one completed prompt/response exchange
    pub fn add_exchange(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.messages.push_back(Message::user(prompt));
        self.messages.push_back(Message::assistant(response));
        self.truncate();
    }

    /// Drop whole exchanges from the front until the history fits the budget
    fn truncate(&mut self) {
        while self.history_tokens() > self.token_budget && !self.messages.is_empty() {
            self.messages.pop_front();
            if self.messages.front().is_some_and(|m| m.role == "assistant") {
                self.messages.pop_front();
            }
        }
    }

    /// Estimated tokens held in history
    pub fn history_tokens(&self) -> usize {
        self.messages.iter().map(|m| estimate_tokens(&m.content)).sum()
    }

    /// System prompt, history, then the pending prompt
    pub fn messages_with(&self, prompt: &str) -> Vec<Message> {
        let mut result = Vec::with_capacity(self.messages.len() + 2);

        if let Some(ref system) = self.system_prompt {
            result.push(Message::system(system.clone()));
        }

        result.extend(self.messages.iter().cloned());
        result.push(Message::user(prompt));
        result
    }

    /// Get messages without system prompt
    pub fn get_history(&self) -> &VecDeque<Message> {
        &self.messages
    }

    /// Get the last assistant message
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == "assistant")
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(8000)
    }
}
