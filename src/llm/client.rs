//! Model client
//!
//! Binds a provider to one model and adds per-attempt timeouts plus
//! retry with exponential backoff. Agents and the judge talk to models only
//! through this type.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::core::config::GenerationConfig;
use crate::core::{Message, ProviderError};
use crate::llm::traits::{GenerateOptions, LLMProvider, ProviderResult};

/// Retry schedule for failed provider calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Backoff ceiling before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff with "equal jitter": half fixed, half random
    fn jittered_delay(&self, retry: u32) -> Duration {
        let ceiling = self.delay_for(retry);
        let half = ceiling / 2;
        let spread = half.as_millis() as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..=spread)
        };
        half + Duration::from_millis(jitter)
    }
}

/// A provider bound to one model, with timeout and retry
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: GenerateOptions,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            options: GenerateOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                json_mode: config.json_mode,
            },
            timeout: Duration::from_secs(config.timeout_seconds),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Single prompt completion
    pub async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        self.generate_messages(&[Message::user(prompt)]).await
    }

    /// Completion over a message history; the last message is the prompt
    pub async fn generate_messages(&self, messages: &[Message]) -> ProviderResult<String> {
        match messages.last() {
            Some(last) if !last.content.trim().is_empty() => {}
            _ => return Err(ProviderError::invalid_request("Prompt must not be empty")),
        }

        let mut retry = 0;
        loop {
            match self.attempt(messages).await {
                Ok(text) => return Ok(text),
                Err(err) if err.kind.is_retryable() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.jittered_delay(retry);
                    warn!(
                        model = %self.model,
                        kind = %err.kind,
                        retry,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(model = %self.model, error = %err, retries = retry, "provider call gave up");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, messages: &[Message]) -> ProviderResult<String> {
        let call = self
            .provider
            .chat(&self.model, messages, Some(self.options.clone()));

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ProviderError::timeout(format!(
                    "{} did not answer within {}s",
                    self.model,
                    self.timeout.as_secs()
                ))
            })??;

        if response.content.trim().is_empty() {
            return Err(ProviderError::invalid_response("Model returned an empty response"));
        }
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_within_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        };
        for _ in 0..50 {
            let d = policy.jittered_delay(2);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_zero_backoff() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        assert_eq!(policy.jittered_delay(1), Duration::ZERO);
    }
}
