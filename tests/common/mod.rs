//! Shared helpers for integration tests
//!
//! `ScriptedProvider` answers each model name from a fixed script so debates
//! run without a live backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use multi_llm_debate::core::config::ModelPool;
use multi_llm_debate::core::{
    Config, Message, PeerView, ProviderError, ProviderErrorKind, ProviderType, Question,
};
use multi_llm_debate::llm::{
    BoolQPromptBuilder, GenerateOptions, LLMProvider, LLMResponse, PromptBuilder, ProviderRegistry,
    ProviderResult,
};

/// One scripted reaction to a chat call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Answer after a (virtual) delay
    Delayed(Duration, String),
    Fail(ProviderErrorKind),
    /// Never answers
    Hang,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn answer(answer: &str) -> Self {
        Reply::Text(format!("Step 1: read the passage.\nFinal Answer: {}", answer))
    }
}

/// Provider replaying per-model scripts; the last reply repeats forever
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Vec<Reply>>,
    calls: Mutex<HashMap<String, usize>>,
    prompts: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, model: &str, replies: Vec<Reply>) -> Self {
        self.scripts.insert(model.to_string(), replies);
        self
    }

    pub fn always(self, model: &str, reply: Reply) -> Self {
        self.script(model, vec![reply])
    }

    pub fn calls(&self, model: &str) -> usize {
        self.calls.lock().unwrap().get(model).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Last user prompt of every call, per model, in call order
    pub fn prompts_for(&self, model: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, model: &str) -> Option<Reply> {
        let script = self.scripts.get(model)?;
        let mut calls = self.calls.lock().unwrap();
        let n = calls.entry(model.to_string()).or_insert(0);
        let reply = script.get(*n).or_else(|| script.last()).cloned();
        *n += 1;
        reply
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> ProviderResult<LLMResponse> {
        if let Some(last) = messages.last() {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), last.content.clone()));
        }

        let reply = self.next_reply(model).ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::InvalidRequest, format!("no script for {}", model))
        })?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let content = match reply {
            Reply::Text(text) => text,
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
            Reply::Fail(kind) => return Err(ProviderError::new(kind, "scripted failure")),
            Reply::Hang => std::future::pending().await,
        };

        Ok(LLMResponse {
            content,
            usage: None,
            model: model.to_string(),
        })
    }

    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        Ok(self.scripts.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Prompt builder that records how it was used
#[derive(Default)]
pub struct RecordingPrompts {
    inner: BoolQPromptBuilder,
    round_zero_calls: AtomicUsize,
    round_n_calls: AtomicUsize,
    peer_views: Mutex<Vec<Vec<PeerView>>>,
}

impl RecordingPrompts {
    pub fn round_zero_calls(&self) -> usize {
        self.round_zero_calls.load(Ordering::SeqCst)
    }

    pub fn round_n_calls(&self) -> usize {
        self.round_n_calls.load(Ordering::SeqCst)
    }

    /// Peers handed to each `round_n` call
    pub fn peer_views(&self) -> Vec<Vec<PeerView>> {
        self.peer_views.lock().unwrap().clone()
    }
}

impl PromptBuilder for RecordingPrompts {
    fn round_zero(&self, question: &Question) -> String {
        self.round_zero_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.round_zero(question)
    }

    fn round_n(&self, question: &Question, peers: &[&PeerView]) -> String {
        self.round_n_calls.fetch_add(1, Ordering::SeqCst);
        self.peer_views
            .lock()
            .unwrap()
            .push(peers.iter().map(|p| (*p).clone()).collect());
        self.inner.round_n(question, peers)
    }
}

/// One Ollama-backed agent per model name, no retries
pub fn config(models: &[&str]) -> Config {
    let mut config = Config::default();
    config.models = models
        .iter()
        .map(|m| ModelPool::new(ProviderType::Ollama, *m, 1))
        .collect();
    config.generation.max_retries = 0;
    config.generation.timeout_seconds = 60;
    config
}

/// Registry serving every Ollama model from `provider`
pub fn registry(provider: Arc<ScriptedProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderType::Ollama, provider);
    registry
}

pub fn question() -> Question {
    Question::new("boolq_1", "is the sky blue on a clear day")
        .with_passage("On a clear day the sky appears blue because of Rayleigh scattering.")
}
