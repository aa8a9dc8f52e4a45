use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Per-request timeout. The downstream model is typically co-located, so a
/// request that takes longer than this is considered stuck.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Initial call plus three retries, so every backoff step is exercised.
const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("failed to build HTTP client: {0}")]
    Init(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Empty response from LLM")]
    EmptyResponse,
}

/// The seam the pipeline talks through. Tests substitute a deterministic
/// stub; production uses [`LlmClient`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Init(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url,
            model: config.model.clone(),
            client,
        })
    }

    async fn call_chat(&self, messages: &[OpenAIMessage]) -> Result<String, LlmError> {
        let body = OpenAIRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(chat_completions_url(&self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let parsed: OpenAIResponse = resp.json().await?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    /// Send one system+user exchange, retrying transient failures with
    /// linear backoff (0.5s, 1.0s, 1.5s). The terminal error propagates so
    /// the caller can downgrade gracefully.
    async fn invoke(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ];

        let mut last_error = LlmError::EmptyResponse;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.call_chat(&messages).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "LLM call failed");
                    last_error = e;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(BACKOFF_STEP * attempt).await;
                    }
                }
            }
        }
        Err(last_error)
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
}

#[derive(Serialize, Clone)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: String,
}

fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}
