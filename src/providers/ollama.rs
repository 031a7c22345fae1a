//! Ollama provider.
//!
//! Speaks the Ollama generate API: a flat `prompt` field posted to
//! `{base_url}/api/generate`, no auth header, no streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{truncate_body, Provider, ProviderError, ProviderKind};
use crate::config::AiServiceConfig;

/// Ollama provider (`ollama` service type).
#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &AiServiceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| ProviderError::Network {
                provider: "Ollama",
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    fn build_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|err| ProviderError::Network {
                provider: "Ollama",
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "Ollama",
                message: format!("HTTP {}: {}", status, truncate_body(&body)),
            });
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|err| ProviderError::InvalidResponse {
                    provider: "Ollama",
                    message: err.to_string(),
                })?;

        if body.response.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: "Ollama",
                message: "response field was empty".to_string(),
            });
        }

        Ok(body.response)
    }
}

// API types

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> AiServiceConfig {
        AiServiceConfig {
            service_type: "ollama".to_string(),
            base_url: base_url.to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_endpoint_appends_generate_path() {
        let provider = OllamaProvider::new(&config("http://localhost:11434")).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434/api/generate");

        let provider = OllamaProvider::new(&config("http://localhost:11434/")).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_provider_accessors() {
        let provider = OllamaProvider::new(&config("http://localhost:11434")).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Ollama);
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_request_body_disables_streaming() {
        let provider = OllamaProvider::new(&config("http://localhost:11434")).unwrap();
        let value = serde_json::to_value(provider.build_request("hello")).unwrap();
        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["prompt"], "hello");
        assert_eq!(value["stream"], false);
    }
}
