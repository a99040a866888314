//! Ollama language-model client.
//!
//! The pipeline stages depend on the [`LanguageModel`] trait, not on Ollama
//! itself. Production code uses [`OllamaClient`]; tests use
//! [`FakeLanguageModel`] with scripted completions and no network.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmConfig;

/// Bounds for a single completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Maximum tokens the model may emit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-call timeout
    pub timeout: Duration,
}

/// Seam between the pipeline stages and the hosted model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Request a bounded completion for a system + user prompt pair.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: &CompletionOptions,
    ) -> Result<String>;

    /// Cheap reachability check.
    async fn is_available(&self) -> bool;
}

// ============================================================================
// Ollama client (production)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Client for the Ollama chat API.
pub struct OllamaClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(
                    config.synthesizer_timeout_secs.max(config.formatter_timeout_secs),
                ))
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: &CompletionOptions,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.endpoint);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: opts.temperature,
                num_predict: opts.max_tokens,
            },
        };

        debug!(
            "LLM call [{}] ({} system chars, {} user chars)",
            self.model,
            system.len(),
            user.len()
        );

        let response = self
            .http_client
            .post(&url)
            .timeout(opts.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama returned error {}: {}", status, error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        info!(
            "LLM response [{}] ({} chars)",
            self.model,
            chat_response.message.content.len()
        );

        Ok(chat_response.message.content)
    }

    async fn is_available(&self) -> bool {
        self.http_client
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

// ============================================================================
// Fake language model (testing)
// ============================================================================

/// One recorded `complete` call, for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

/// Deterministic fake that serves scripted completions in order.
pub struct FakeLanguageModel {
    replies: Mutex<Vec<String>>,
    failure: Option<String>,
    available: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeLanguageModel {
    /// Serve the given completions in order; a call past the end errors.
    pub fn scripted(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            failure: None,
            available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
            available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reachability check fails and every call errors.
    pub fn unavailable() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            failure: Some("model backend is not reachable".to_string()),
            available: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        _opts: &CompletionOptions,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
        });

        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }

        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow!("fake model has no scripted reply left"))
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}
