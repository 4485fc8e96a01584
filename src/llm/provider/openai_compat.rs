//! OpenAI-compatible Provider
//!
//! Hosted chat completions endpoint (`{base_url}/chat/completions`) with a
//! bearer key. Serves every model configured with `provider = "api"`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, DebateError, Message, ProviderError, Result};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, ProviderResult, TokenUsage};

/// Fixed sampling seed sent with every request
const SEED: u64 = 42;

pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    seed: u64,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiCompatProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config
            .providers
            .api
            .base_url
            .clone()
            .ok_or_else(|| DebateError::config("providers.api.base_url is not set"))?;
        Self::new(base_url, config.providers.api.api_key.clone())
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(DebateError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn build_request<'a>(
        model: &'a str,
        messages: &'a [Message],
        options: Option<GenerateOptions>,
    ) -> CompletionRequest<'a> {
        let options = options.unwrap_or_default();
        CompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
            seed: SEED,
        }
    }

    fn to_llm_response(model: &str, response: CompletionResponse) -> ProviderResult<LLMResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::invalid_response("Response has no message content"))?;

        Ok(LLMResponse {
            content,
            usage: response
                .usage
                .and_then(|u| TokenUsage::from_counts(u.prompt_tokens, u.completion_tokens)),
            model: response.model.unwrap_or_else(|| model.to_string()),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAiCompatProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> ProviderResult<LLMResponse> {
        let request = Self::build_request(model, messages, options);
        debug!(model, messages = messages.len(), "api chat request");

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &error_text));
        }

        let body = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse completion: {}", e))
        })?;

        Self::to_llm_response(model, parsed)
    }

    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        let response = self
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &error_text));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    fn name(&self) -> &str {
        "api"
    }
}
