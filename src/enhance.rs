//! Description enhancement through a generative-text service.
//!
//! [`TextEnhancer`] is the contract; [`ChatCompletionsEnhancer`] posts to any
//! OpenAI-compatible chat completions URL.

use crate::config::EnhanceConfig;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You write concise, compelling meta descriptions for websites. \
Reply with the improved description only: plain text, no quotes, at most 160 characters.";

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("missing API key: set {0}")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream returned no text")]
    Empty,
}

#[async_trait]
pub trait TextEnhancer: Send + Sync {
    async fn enhance(&self, text: &str) -> Result<String, EnhanceError>;
}

/// Async client for OpenAI-compatible chat completion endpoints.
#[derive(Clone)]
pub struct ChatCompletionsEnhancer {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatCompletionsEnhancer {
    pub fn new(api_key: &str, config: &EnhanceConfig) -> Result<Self, EnhanceError> {
        if api_key.trim().is_empty() {
            return Err(EnhanceError::MissingApiKey(config.api_key_env.clone()));
        }
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EnhanceError::MissingApiKey(config.api_key_env.clone()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Build from the API key in the environment variable named by the config.
    pub fn from_env(config: &EnhanceConfig) -> Result<Self, EnhanceError> {
        let key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self::new(&key, config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextEnhancer for ChatCompletionsEnhancer {
    async fn enhance(&self, text: &str) -> Result<String, EnhanceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.7,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EnhanceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| clean_reply(&s))
            .filter(|s| !s.is_empty())
            .ok_or(EnhanceError::Empty)
    }
}

/// Trim whitespace and one pair of wrapping quotes from a model reply.
pub fn clean_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
