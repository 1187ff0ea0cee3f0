// quiz-api-rs/src/openai_client.rs
//
// HTTP client for the OpenAI chat-completions API.
//
// This module provides:
// - A config struct sourced from the environment once at startup and passed
//   into the client explicitly (no global credential state)
// - A single-attempt completion call via reqwest; no retries, no per-call
//   timeout override
//
// Configuration (.env file):
// - OPENAI_API_KEY: API key for OpenAI (required)
// - OPENAI_API_URL: chat-completions endpoint (defaults to the OpenAI API)
// - OPENAI_MODEL: model to use (default: "gpt-3.5-turbo")

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Errors from configuration or a completion attempt.
#[derive(Debug, Error)]
pub enum OpenAIError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("request to OpenAI failed: {0}")]
    Network(String),
    #[error("OpenAI returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected completion payload: {0}")]
    MalformedReply(String),
}

/// Connection settings for the completion client. Built once at startup and
/// handed to `OpenAIClient::new`; nothing in this module reads the
/// environment after that.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
}

impl OpenAIConfig {
    /// Read the config from environment variables. Fails when the API key is
    /// absent or empty so a misconfigured deployment dies at startup instead
    /// of on the first request.
    pub fn from_env() -> Result<Self, OpenAIError> {
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            return Err(OpenAIError::MissingApiKey);
        }

        let api_url = env::var("OPENAI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self { api_key, api_url, model })
    }
}

/// Thin client over the chat-completions endpoint. One HTTP call per
/// `complete` invocation; reqwest's default timeouts apply.
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Send `prompt` as a single system message and return the trimmed text
    /// content of the first completion choice.
    pub async fn complete(&self, prompt: &str) -> Result<String, OpenAIError> {
        let request_body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: prompt.to_string(),
            }],
        };

        log::info!(
            "Requesting completion from {} (model: {})",
            self.config.api_url,
            self.config.model
        );

        let response = match self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                if err.is_timeout() {
                    return Err(OpenAIError::Network(format!("Request timed out: {}", err)));
                } else if err.is_connect() {
                    return Err(OpenAIError::Network(format!("Connection failed: {}", err)));
                } else {
                    return Err(OpenAIError::Network(format!("Network error: {}", err)));
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("OpenAI returned error status {}: {}", status, text);
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let data: ChatCompletionResponse = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                return Err(OpenAIError::MalformedReply(format!(
                    "Failed to parse response: {}",
                    err
                )));
            }
        };

        if let Some(usage) = &data.usage {
            log::info!("Completion used {} tokens", usage.total_tokens);
        }

        match data.choices.first() {
            Some(choice) => Ok(choice.message.content.trim().to_string()),
            None => Err(OpenAIError::MalformedReply(
                "No choices returned in response".to_string(),
            )),
        }
    }
}
