//! AI provider abstraction.
//!
//! One capability — turn a prompt into suggestion text — over a closed set
//! of backend API shapes. The variant is selected once from configuration;
//! transport failures surface as readable text through the dispatcher so
//! the display layer always has something to show.

pub mod anthropic;
pub mod chat;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AiServiceConfig;

pub use anthropic::AnthropicProvider;
pub use chat::ChatProvider;
pub use ollama::OllamaProvider;

/// Available backend API shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions API
    OpenAi,
    /// Ollama generate API (flat prompt, no auth)
    Ollama,
    /// Anthropic messages API
    Anthropic,
    /// Any OpenAI-compatible endpoint
    Custom,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "custom" => Ok(ProviderKind::Custom),
            _ => Err(format!(
                "Unknown provider: {}. Valid options: openai, ollama, anthropic, custom",
                s
            )),
        }
    }
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unsupported provider type `{0}`. Valid options: openai, ollama, anthropic, custom")]
    UnsupportedType(String),

    #[error("API key not configured for {provider}")]
    MissingApiKey { provider: &'static str },

    #[error("API error from {provider}: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("network error talking to {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

/// Capability implemented by every backend variant.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Which shape this provider speaks
    fn kind(&self) -> ProviderKind;

    /// Display name
    fn name(&self) -> &'static str;

    /// Configured model identifier
    fn model(&self) -> &str;

    /// Send one prompt, return the suggestion text. Bounded by the
    /// configured per-service timeout; never retried.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Build the provider variant named by the service configuration. The type
/// string is matched case-insensitively; unrecognized values are fatal for
/// the call.
pub fn create_provider(config: &AiServiceConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let kind: ProviderKind = config
        .service_type
        .parse()
        .map_err(|_| ProviderError::UnsupportedType(config.service_type.clone()))?;

    Ok(match kind {
        ProviderKind::OpenAi | ProviderKind::Custom => Box::new(ChatProvider::new(config, kind)?),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config)?),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(config)?),
    })
}

/// Uniform entry point used by the pipeline: failures in the one explicit
/// user-requested action are shown, never swallowed.
pub struct Dispatcher {
    provider: Box<dyn Provider>,
}

impl Dispatcher {
    pub fn from_config(config: &AiServiceConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            provider: create_provider(config)?,
        })
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Call the backend and always come back with displayable text: either
    /// the suggestion or a readable description of what went wrong.
    pub async fn suggest(&self, prompt: &str) -> String {
        match self.provider.complete(prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => format!("AI request failed: {err}"),
        }
    }
}

/// Shared helper: shorten an HTTP error body for display.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_string()
    } else {
        let mut end = LIMIT;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    }
}
