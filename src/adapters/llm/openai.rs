//! OpenAI chat-completions adapter.
//!
//! Sends the system prompt and a single user context block to
//! `{base_url}/chat/completions` and returns the first choice's text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::LlmConfig;
use crate::domain::ports::{ChatModel, LlmError};

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiChatModel {
    /// Client for `config.model`. The key falls back to `OPENAI_API_KEY`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::for_model(config, &config.model)
    }

    /// Client for the configured fallback model, when enabled.
    pub fn fallback(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        if !config.fallback_enabled {
            return Ok(None);
        }
        Self::for_model(config, &config.fallback_model).map(Some)
    }

    pub fn for_model(config: &LlmConfig, model: &str) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                LlmError::NotConfigured(
                    "OPENAI_API_KEY not set; cannot initialize chat client".to_string(),
                )
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("Failed to build HTTP client: {e}")))?;

        debug!(model, temperature = config.temperature, "Initializing chat model");
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system_prompt: &str, context: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("API error {status}: {body}")));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_configured() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let err = OpenAiChatModel::new(&LlmConfig::default()).err().unwrap();
            assert!(matches!(err, LlmError::NotConfigured(_)));
        });
    }

    #[test]
    fn test_fallback_only_when_enabled() {
        let mut config = LlmConfig {
            api_key: Some("k".to_string()),
            fallback_model: "gpt-4o".to_string(),
            ..Default::default()
        };
        assert!(OpenAiChatModel::fallback(&config).unwrap().is_none());

        config.fallback_enabled = true;
        let fallback = OpenAiChatModel::fallback(&config).unwrap().unwrap();
        assert_eq!(fallback.model(), "gpt-4o");
    }

    #[test]
    fn test_request_shape() {
        let request = CompletionRequest {
            model: "m",
            temperature: 1.0,
            max_tokens: None,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "ctx",
                },
            ],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][1]["content"], "ctx");
    }
}
