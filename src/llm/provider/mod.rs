//! LLM Provider implementations and factory
//!
//! Submodules implement hosted providers; the local Ollama client lives in
//! `llm::ollama`.

pub mod openai_compat;

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{AggregationMode, Config};
use crate::core::{DebateError, ProviderType, Result};
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::openai_compat::OpenAiCompatProvider;

/// Create a new LLM provider of the given type
pub fn create_provider(provider: ProviderType, config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::Api => Arc::new(OpenAiCompatProvider::from_config(config)?),
    };
    Ok(provider)
}

/// One shared provider instance per backend type
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every provider the configuration refers to
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();

        let mut needed: Vec<ProviderType> = config.models.iter().map(|m| m.provider).collect();
        if config.debate.aggregation_mode == AggregationMode::Judge {
            if let Some(ref judge) = config.debate.judge {
                needed.push(judge.provider);
            }
        }

        for provider in needed {
            if !registry.providers.contains_key(&provider) {
                registry.register(provider, create_provider(provider, config)?);
            }
        }

        Ok(registry)
    }

    /// Register (or replace) the provider serving a backend type
    pub fn register(&mut self, provider: ProviderType, instance: Arc<dyn LLMProvider>) {
        self.providers.insert(provider, instance);
    }

    /// Registered providers, in no particular order
    pub fn providers(&self) -> impl Iterator<Item = (ProviderType, &Arc<dyn LLMProvider>)> {
        self.providers.iter().map(|(ty, provider)| (*ty, provider))
    }

    /// Look up a provider; unknown types are a configuration error
    pub fn resolve(&self, provider: ProviderType) -> Result<Arc<dyn LLMProvider>> {
        self.providers
            .get(&provider)
            .cloned()
            .ok_or_else(|| DebateError::config(format!("Provider '{}' is unresolvable", provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ModelPool;

    #[test]
    fn test_registry_from_default_config() {
        let config = Config::default();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.resolve(ProviderType::Ollama).unwrap().name(), "ollama");
        assert!(registry.resolve(ProviderType::Api).is_err());
    }

    #[test]
    fn test_api_provider_requires_base_url() {
        let mut config = Config::default();
        config.models = vec![ModelPool::new(ProviderType::Api, "gpt-4o", 1)];
        config.providers.api.base_url = None;
        assert!(ProviderRegistry::from_config(&config).is_err());
    }
}
