//! Chat completion (LLM) client abstraction
//!
//! Provides:
//! - The message/params/usage types shared by both generation modes
//! - An OpenAI-compatible HTTP client
//! - A scripted mock for tests

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One prompt or conversation message. Also the shape of a caller-supplied
/// conversation turn; the core never persists these across requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Model call parameters, mode-specific defaults chosen by the orchestrator
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A completed model call
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: u32,
}

/// Trait for chat completion generation
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion>;

    /// Default model used when the request does not name one
    fn default_model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    total_tokens: u32,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "generation.api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&CompletionRequest {
                model: &params.model,
                messages,
                max_tokens: params.max_tokens,
                temperature: params.temperature,
            })
            .send()
            .await
            .map_err(|e| AppError::GenerationUnavailable {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationUnavailable {
                message: format!("API error {}: {}", status, body),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!("Generation API error {}: {}", status, body),
            });
        }

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::GenerationUnavailable {
                    message: format!("Failed to parse response: {}", e),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::GenerationMalformed {
                message: "Model returned no content".to_string(),
            })?;

        Ok(ChatCompletion {
            content,
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Scripted mock (tests)
// ---------------------------------------------------------------------------

enum Scripted {
    Reply(ChatCompletion),
    TransientFailure(String),
}

/// Mock chat client: replays scripted responses in order and records the
/// message lists it received.
#[derive(Default)]
pub struct MockChatClient {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, content: impl Into<String>, total_tokens: u32) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(ChatCompletion {
                content: content.into(),
                total_tokens,
            }));
    }

    pub fn push_transient_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::TransientFailure(message.into()));
    }

    /// Message lists received so far, in call order
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<ChatCompletion> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(completion)) => Ok(completion),
            Some(Scripted::TransientFailure(message)) => {
                Err(AppError::GenerationUnavailable { message })
            }
            None => Err(AppError::Internal {
                message: "MockChatClient script exhausted".to_string(),
            }),
        }
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let client = MockChatClient::new();
        client.push_transient_failure("rate limited");
        client.push_reply("hello", 12);

        let params = GenerationParams {
            model: "mock-model".to_string(),
            temperature: 0.7,
            max_tokens: 100,
        };

        let first = client.complete(&[ChatMessage::user("hi")], &params).await;
        assert!(matches!(
            first,
            Err(AppError::GenerationUnavailable { .. })
        ));

        let second = client
            .complete(&[ChatMessage::user("hi")], &params)
            .await
            .unwrap();
        assert_eq!(second.content, "hello");
        assert_eq!(second.total_tokens, 12);
        assert_eq!(client.calls().len(), 2);
    }
}
