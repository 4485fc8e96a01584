//! LLM Provider trait for abstracting different backends
//!
//! Local and hosted models are served through the same `chat` capability;
//! a new backend is added by implementing `LLMProvider`.

use async_trait::async_trait;

use crate::core::{Message, ProviderError};

/// Result of a single provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Text content of the response
    pub content: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn from_counts(prompt: Option<u32>, completion: Option<u32>) -> Option<Self> {
        match (prompt, completion) {
            (Some(prompt), Some(completion)) => Some(Self {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        }
    }
}

/// Options for LLM generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Ask for a JSON object response
    pub json_mode: bool,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a response from messages
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> ProviderResult<LLMResponse>;

    /// List available models
    async fn list_models(&self) -> ProviderResult<Vec<String>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
