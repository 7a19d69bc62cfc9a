use crate::config::TranslateConfig;
use crate::error::{FaqKitError, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "FAQKIT_API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Anything that can answer a chat-completion request with plain text.
pub trait TranslationBackend {
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
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

/// Blocking client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ChatCompletionsBackend {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionsBackend {
    pub fn new(config: &TranslateConfig, api_key: String) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    /// Read the key from the first set variable in [`API_KEY_VARS`].
    pub fn from_env(config: &TranslateConfig) -> Result<Self> {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| FaqKitError::MissingEnv {
                name: API_KEY_VARS[0].to_string(),
            })?;

        Self::new(config, api_key)
    }
}

impl TranslationBackend for ChatCompletionsBackend {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!(endpoint = %self.endpoint, model = %request.model, "sending chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(FaqKitError::BackendStatus {
                status: status.as_u16(),
                message: extract_error_message(status, &body),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| FaqKitError::Backend {
            message: format!("invalid response body: {}", e),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| FaqKitError::Backend {
                message: "response has no choices[0].message.content".to_string(),
            })
    }
}

fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("empty response body")
            .to_string();
    }

    trimmed.chars().take(400).collect()
}
