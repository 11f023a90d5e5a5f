//! Chat-completions client for the hosted model endpoint.
//!
//! Every agent role talks to the model through the [`ChatModel`] trait.
//! [`LlmClient`] is the production implementation: an OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default) authenticated with a
//! bearer API key.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelConfig;

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
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

    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }
}

/// Failures talking to the model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to model endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("model response contained no message")]
    EmptyResponse,

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model call cancelled")]
    Cancelled,
}

/// Anything that can answer a conversation under a system instruction.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation so far and return the reply text.
    async fn chat(&self, system: &str, messages: &[Message]) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
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
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &ModelConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, system: &str, messages: &[Message]) -> Result<String, LlmError> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(Message::system(system));
        all.extend_from_slice(messages);

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: all,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}
