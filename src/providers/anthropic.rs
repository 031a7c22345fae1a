//! Anthropic provider.
//!
//! Speaks the Anthropic Messages API: a message envelope with `x-api-key`
//! and `anthropic-version` headers, text content blocks in the response.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{truncate_body, Provider, ProviderError, ProviderKind};
use crate::config::AiServiceConfig;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

const MAX_TOKENS: u32 = 500;

/// Anthropic provider (`anthropic` service type).
#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(config: &AiServiceConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey {
                provider: "Anthropic",
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| ProviderError::Network {
                provider: "Anthropic",
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn build_request(&self, prompt: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|err| ProviderError::Network {
                provider: "Anthropic",
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "Anthropic",
                message: format!("HTTP {}: {}", status, truncate_body(&body)),
            });
        }

        let body: MessagesResponse =
            response
                .json()
                .await
                .map_err(|err| ProviderError::InvalidResponse {
                    provider: "Anthropic",
                    message: err.to_string(),
                })?;

        let content = body
            .content
            .into_iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    Some(block.text)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: "Anthropic",
                message: "response contained no text blocks".to_string(),
            });
        }

        Ok(content)
    }
}

// API types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>) -> AiServiceConfig {
        AiServiceConfig {
            service_type: "anthropic".to_string(),
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: key.map(|k| k.to_string()),
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = AnthropicProvider::new(&config(None)).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey { .. }));
    }

    #[test]
    fn test_provider_accessors() {
        let provider = AnthropicProvider::new(&config(Some("test-key"))).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Anthropic);
        assert_eq!(provider.name(), "Anthropic");
        assert_eq!(provider.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_request_body_shape() {
        let provider = AnthropicProvider::new(&config(Some("test-key"))).unwrap();
        let value = serde_json::to_value(provider.build_request("explain this")).unwrap();
        assert_eq!(value["model"], "claude-sonnet-4-20250514");
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "explain this");
    }

    #[test]
    fn test_response_parsing_ignores_non_text_blocks() {
        let raw = r#"{"content":[{"type":"thinking","text":""},{"type":"text","text":"the answer"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|b| b.content_type == "text")
            .map(|b| b.text)
            .collect();
        assert_eq!(text, vec!["the answer"]);
    }
}
