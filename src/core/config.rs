//! Configuration management for debates
//!
//! Supports environment variables, config files, and runtime overrides.
//! Model pools are interchangeable via settings.
//!
//! Config file location: ~/.config/multi-llm-debate/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{DebateError, Result};
use crate::core::types::{AgentIdentity, ProviderType};

/// Main configuration for the debate harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Debate protocol settings
    #[serde(default)]
    pub debate: DebateConfig,
    /// Per-call generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Evaluation driver settings
    #[serde(default)]
    pub eval: EvalConfig,
    /// Model pools; each pool contributes `quantity` agents
    #[serde(default)]
    pub models: Vec<ModelPool>,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
}

/// Hosted OpenAI-compatible API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. https://api.openai.com/v1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Bearer key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// One pool of identical agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPool {
    pub provider: ProviderType,
    pub model_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    /// Vote weight of each agent in this pool (weighted aggregation)
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Role label for agents in this pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn default_quantity() -> usize {
    1
}

fn default_weight() -> f64 {
    1.0
}

impl ModelPool {
    pub fn new(provider: ProviderType, model_name: impl Into<String>, quantity: usize) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            quantity,
            weight: 1.0,
            role: None,
        }
    }
}

/// How much of each peer's previous turn is shared in the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSharing {
    /// Full response text
    #[default]
    Full,
    /// Extracted answer only
    AnswersOnly,
}

/// How final answers are reduced to one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One agent, one vote
    #[default]
    Majority,
    /// Votes weighted by the pool's `weight`
    Weighted,
    /// An extra judge model call decides
    Judge,
}

/// Judge model used by `AggregationMode::Judge`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub provider: ProviderType,
    pub model_name: String,
}

/// Debate protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Round ceiling
    /// Default: 3
    pub max_rounds: usize,
    /// Stop early when at least k agents agree; unanimous when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence_threshold: Option<usize>,
    pub context_sharing: ContextSharing,
    /// Maximum agent calls in flight per round
    /// Default: 4
    pub max_workers: usize,
    /// Whole-debate timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    pub aggregation_mode: AggregationMode,
    /// Largest tolerated fraction of failed agents in a round
    /// Default: 0.5
    pub failure_tolerance: f64,
    /// Estimated token budget for an agent's conversation history
    /// Default: 8000
    pub history_token_budget: usize,
    /// Stagger between agent dispatches within a round
    pub job_delay_ms: u64,
    /// Ask for step-by-step reasoning in prompts
    pub use_cot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge: Option<JudgeConfig>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            convergence_threshold: None,
            context_sharing: ContextSharing::Full,
            max_workers: 4,
            timeout_seconds: None,
            aggregation_mode: AggregationMode::Majority,
            failure_tolerance: 0.5,
            history_token_budget: 8000,
            job_delay_ms: 0,
            use_cot: true,
            judge: None,
        }
    }
}

/// Per-call generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Timeout of a single attempt
    pub timeout_seconds: u64,
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Ask the provider for a JSON response
    pub json_mode: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 3200,
            timeout_seconds: 30,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8000,
            json_mode: false,
        }
    }
}

/// Evaluation driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Debates run concurrently across the dataset
    pub parallel_debates: usize,
    /// JSONL file receiving one outcome per question
    pub output: PathBuf,
    /// Re-run questions already present in the output
    pub overwrite: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            parallel_debates: 1,
            output: PathBuf::from("data/results.jsonl"),
            overwrite: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            debate: DebateConfig::default(),
            generation: GenerationConfig::default(),
            eval: EvalConfig::default(),
            models: vec![ModelPool::new(ProviderType::Ollama, "llama3.2:3b", 3)],
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multi-llm-debate")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from(&Self::config_file()).unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load configuration from an explicit file; the file must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DebateError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| DebateError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DebateError::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env(&mut self) {
        if let Ok(host) = env::var("OLLAMA_HOST") {
            self.providers.ollama.host = host;
        }
        if let Some(port) = env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
            self.providers.ollama.port = port;
        }
        if let Ok(url) = env::var("DEBATE_API_BASE_URL") {
            self.providers.api.base_url = Some(url);
        }
        if let Ok(key) = env::var("DEBATE_API_KEY") {
            self.providers.api.api_key = Some(key);
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| DebateError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DebateError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| DebateError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.providers.ollama.host, self.providers.ollama.port
        )
    }

    /// Total number of agents across all pools
    pub fn agent_count(&self) -> usize {
        self.models.iter().map(|m| m.quantity).sum()
    }

    /// Agent identities in canonical order: pools in file order, indices from 0
    pub fn agent_identities(&self) -> Vec<AgentIdentity> {
        self.models
            .iter()
            .flat_map(|pool| std::iter::repeat(pool).take(pool.quantity))
            .enumerate()
            .map(|(index, pool)| AgentIdentity {
                index,
                provider: pool.provider,
                model: pool.model_name.clone(),
                role: pool.role.clone().unwrap_or_else(|| "debater".to_string()),
            })
            .collect()
    }

    /// Vote weight per agent index
    pub fn agent_weights(&self) -> Vec<f64> {
        self.models
            .iter()
            .flat_map(|pool| std::iter::repeat(pool.weight).take(pool.quantity))
            .collect()
    }

    /// Check the structure before any debate is attempted
    pub fn validate(&self) -> Result<()> {
        let agents = self.agent_count();
        if agents == 0 {
            return Err(DebateError::config("At least one agent is required"));
        }
        if let Some(pool) = self.models.iter().find(|m| m.model_name.trim().is_empty()) {
            return Err(DebateError::config(format!(
                "Model pool for provider '{}' has no model name",
                pool.provider
            )));
        }
        if self.models.iter().any(|m| !(m.weight.is_finite() && m.weight >= 0.0)) {
            return Err(DebateError::config("Pool weights must be finite and non-negative"));
        }
        if self.debate.max_rounds == 0 {
            return Err(DebateError::config("max_rounds must be at least 1"));
        }
        if self.debate.max_workers == 0 {
            return Err(DebateError::config("max_workers must be at least 1"));
        }
        if let Some(k) = self.debate.convergence_threshold {
            if k == 0 || k > agents {
                return Err(DebateError::config(format!(
                    "convergence_threshold must be between 1 and {} (agent count), got {}",
                    agents, k
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.debate.failure_tolerance) {
            return Err(DebateError::config("failure_tolerance must be within 0.0..=1.0"));
        }
        if self.eval.parallel_debates == 0 {
            return Err(DebateError::config("parallel_debates must be at least 1"));
        }

        let judge_provider = match (self.debate.aggregation_mode, &self.debate.judge) {
            (AggregationMode::Judge, None) => {
                return Err(DebateError::config(
                    "aggregation_mode = \"judge\" requires a [debate.judge] model",
                ))
            }
            (AggregationMode::Judge, Some(judge)) => Some(judge.provider),
            _ => None,
        };

        let needs_api = self.models.iter().any(|m| m.provider == ProviderType::Api)
            || judge_provider == Some(ProviderType::Api);
        if needs_api && self.providers.api.base_url.is_none() {
            return Err(DebateError::config(
                "Provider 'api' is unresolvable: set providers.api.base_url or DEBATE_API_BASE_URL",
            ));
        }

        Ok(())
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.debate.max_rounds, 3);
        assert_eq!(config.debate.max_workers, 4);
        assert_eq!(config.generation.timeout_seconds, 30);
        assert_eq!(config.agent_count(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(
            r#"
            [debate]
            max_rounds = 5
            convergence_threshold = 2
            context_sharing = "answers_only"
            aggregation_mode = "weighted"

            [[models]]
            provider = "ollama"
            model_name = "phi3"
            quantity = 2

            [[models]]
            provider = "api"
            model_name = "gpt-4o"
            weight = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.debate.max_rounds, 5);
        assert_eq!(config.debate.context_sharing, ContextSharing::AnswersOnly);
        assert_eq!(config.debate.aggregation_mode, AggregationMode::Weighted);
        assert_eq!(config.agent_count(), 3);
        assert_eq!(config.agent_weights(), vec![1.0, 1.0, 2.0]);
        // defaults survive partial sections
        assert_eq!(config.debate.max_workers, 4);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = Config::from_toml(
            r#"
            [[models]]
            provider = "carrier-pigeon"
            model_name = "coo"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DebateError::Config(_)));
    }

    #[test]
    fn test_agent_identities_are_contiguous() {
        let mut config = Config::default();
        config.models = vec![
            ModelPool::new(ProviderType::Ollama, "phi3", 2),
            ModelPool::new(ProviderType::Ollama, "llava:13b", 1),
        ];
        let ids = config.agent_identities();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.iter().map(|a| a.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ids[2].model, "llava:13b");
        assert_eq!(ids[0].role, "debater");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.models.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.debate.max_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.debate.convergence_threshold = Some(4);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.debate.aggregation_mode = AggregationMode::Judge;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.models.push(ModelPool::new(ProviderType::Api, "gpt-4o", 1));
        config.providers.api.base_url = None;
        assert!(config.validate().is_err());
        config.providers.api.base_url = Some("https://example.invalid/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default_config_toml();
        assert!(toml_str.contains("max_rounds"));
        assert!(toml_str.contains("model_name"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("multi-llm-debate"));
    }
}
