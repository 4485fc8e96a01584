//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API (non-streaming).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, DebateError, Message, ProviderError, Result};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, ProviderResult, TokenUsage};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_base_url(config.ollama_url())
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(DebateError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(
        model: &'a str,
        messages: &'a [Message],
        options: Option<GenerateOptions>,
    ) -> ChatRequest<'a> {
        let format = options
            .as_ref()
            .filter(|opts| opts.json_mode)
            .map(|_| "json");

        ChatRequest {
            model,
            messages,
            options: options.map(|opts| OllamaOptions {
                temperature: opts.temperature,
                num_predict: opts.max_tokens,
            }),
            format,
            stream: false,
        }
    }

    /// Convert Ollama response to LLMResponse
    fn to_llm_response(response: ChatResponse) -> LLMResponse {
        LLMResponse {
            content: response.message.content,
            usage: TokenUsage::from_counts(response.prompt_eval_count, response.eval_count),
            model: response.model,
        }
    }

    fn connect_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() {
            ProviderError::transport(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            ProviderError::from(e)
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> ProviderResult<LLMResponse> {
        let request = Self::build_request(model, messages, options);
        debug!(model, messages = messages.len(), "ollama chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &error_text));
        }

        let response_text = response.text().await?;
        debug!(model, bytes = response_text.len(), "ollama chat response");

        let chat_response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(Self::to_llm_response(chat_response))
    }

    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &error_text));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_request_json_mode() {
        let messages = vec![Message::user("Hello")];
        let request = OllamaClient::build_request(
            "phi3",
            &messages,
            Some(GenerateOptions {
                temperature: Some(0.2),
                max_tokens: Some(64),
                json_mode: true,
            }),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_request_without_options() {
        let messages = vec![Message::user("Hello")];
        let request = OllamaClient::build_request("phi3", &messages, None);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_response_conversion() {
        let raw = r#"{"model":"phi3","message":{"role":"assistant","content":"Yes"},"prompt_eval_count":10,"eval_count":2}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = OllamaClient::to_llm_response(parsed);
        assert_eq!(response.content, "Yes");
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }
}
