//! LLM module - Language Model integrations
//!
//! Provider abstraction with Ollama and OpenAI-compatible backends, the
//! retrying model client, prompt builders and answer parsers.

pub mod client;
pub mod ollama;
pub mod parsers;
pub mod prompts;
pub mod provider;
pub mod traits;

pub use client::{ModelClient, RetryPolicy};
pub use ollama::OllamaClient;
pub use parsers::{AnswerParser, BoolAnswerParser};
pub use prompts::{BoolQPromptBuilder, PromptBuilder};
pub use provider::{create_provider, ProviderRegistry};
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, ProviderResult, TokenUsage};
