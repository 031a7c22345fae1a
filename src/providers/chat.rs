//! Chat-completions provider.
//!
//! Speaks the OpenAI chat completions shape: a `messages` array with bearer
//! auth. Covers both the `openai` service type and `custom` endpoints that
//! expose the same wire format (where the API key is optional).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{truncate_body, Provider, ProviderError, ProviderKind};
use crate::config::AiServiceConfig;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// Chat-completions provider (`openai` and `custom` service types).
#[derive(Debug)]
pub struct ChatProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    kind: ProviderKind,
}

impl ChatProvider {
    pub fn new(config: &AiServiceConfig, kind: ProviderKind) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty());
        if kind == ProviderKind::OpenAi && api_key.is_none() {
            return Err(ProviderError::MissingApiKey { provider: "OpenAI" });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| ProviderError::Network {
                provider: "OpenAI",
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            kind,
        })
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl Provider for ChatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ProviderKind::Custom => "custom endpoint",
            _ => "OpenAI",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let name = self.name();
        let mut request = self.client.post(&self.endpoint).json(&self.build_request(prompt));
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|err| ProviderError::Network {
            provider: name,
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: name,
                message: format!("HTTP {}: {}", status, truncate_body(&body)),
            });
        }

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|err| ProviderError::InvalidResponse {
                    provider: name,
                    message: err.to_string(),
                })?;

        let content = body
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.map(|m| m.content))
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: name,
                message: "response contained no message content".to_string(),
            });
        }

        Ok(content)
    }
}

// API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}
