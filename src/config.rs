//! Configuration for AI services and feature toggles.
//!
//! The config file is a JSON object holding any number of named AI service
//! entries plus the name of the active one. A missing or malformed file
//! falls back to built-in defaults without raising.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Service types understood by the provider factory.
pub const SERVICE_TYPES: &[(&str, &str)] = &[
    ("openai", "OpenAI-style chat completions API (bearer auth)"),
    ("ollama", "Ollama generate API (flat prompt, no auth)"),
    ("anthropic", "Anthropic messages API (x-api-key auth)"),
    ("custom", "any OpenAI-compatible endpoint (bearer auth optional)"),
];

/// Error types for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("service field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("timeout_seconds must be greater than zero")]
    InvalidTimeout,

    #[error("no AI service named `{0}` is configured")]
    UnknownService(String),
}

/// A single named AI service entry.
///
/// For `openai`, `anthropic` and `custom` services `base_url` is the full
/// endpoint URL; for `ollama` it is the server root (`/api/generate` is
/// appended by the provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServiceConfig {
    #[serde(rename = "type")]
    pub service_type: String,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for AiServiceConfig {
    fn default() -> Self {
        Self {
            service_type: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl AiServiceConfig {
    /// Check the invariants every service entry must hold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_type.trim().is_empty() {
            return Err(ConfigError::EmptyField("type"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyField("base_url"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyField("model"));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Feature toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub auto_error_analysis: bool,
    pub command_suggestion: bool,
    pub context_aware: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            auto_error_analysis: true,
            command_suggestion: true,
            context_aware: true,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai_services: BTreeMap<String, AiServiceConfig>,
    pub active_ai_service: String,
    pub features: Features,
}

impl Default for Config {
    fn default() -> Self {
        let mut ai_services = BTreeMap::new();
        ai_services.insert("local".to_string(), AiServiceConfig::default());
        Self {
            ai_services,
            active_ai_service: "local".to_string(),
            features: Features::default(),
        }
    }
}

impl Config {
    /// Load config from the default path, returning defaults if the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    /// Get the config file path (~/.config/sidekick/config.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sidekick").join("config.json"))
    }

    /// Persist to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        self.save_to_path(&path)
    }

    /// Persist to a specific path, creating parent directories.
    pub fn save_to_path(&self, path: &std::path::Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// The currently active service entry.
    pub fn active_service(&self) -> Result<&AiServiceConfig, ConfigError> {
        self.ai_services
            .get(&self.active_ai_service)
            .ok_or_else(|| ConfigError::UnknownService(self.active_ai_service.clone()))
    }

    /// Add or replace a named service. The first service added becomes
    /// active automatically.
    pub fn set_service(&mut self, name: &str, service: AiServiceConfig) {
        let first = self.ai_services.is_empty();
        self.ai_services.insert(name.to_string(), service);
        if first || self.active_ai_service.is_empty() {
            self.active_ai_service = name.to_string();
        }
    }

    /// Switch the active service to an already-configured name.
    pub fn switch_service(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.ai_services.contains_key(name) {
            return Err(ConfigError::UnknownService(name.to_string()));
        }
        self.active_ai_service = name.to_string();
        Ok(())
    }
}

/// State directory for cross-invocation files (persisted history, dedup
/// window, hook enable flag).
pub fn state_dir() -> Option<PathBuf> {
    // XDG_STATE_HOME or fallback to ~/.local/state
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        Some(PathBuf::from(state_home).join("sidekick"))
    } else {
        dirs::home_dir().map(|h| h.join(".local").join("state").join("sidekick"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.active_ai_service, "local");
        assert!(config.ai_services.contains_key("local"));
        assert!(config.features.auto_error_analysis);
        assert!(config.active_service().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from_path(Some(PathBuf::from("/nonexistent/config.json")));
        assert_eq!(config.active_ai_service, "local");
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not valid json").unwrap();
        let config = Config::load_from_path(Some(file.path().to_path_buf()));
        assert_eq!(config.active_ai_service, "local");
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.set_service(
            "work",
            AiServiceConfig {
                service_type: "anthropic".to_string(),
                base_url: "https://api.anthropic.com/v1/messages".to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
                api_key: Some("test-key".to_string()),
                timeout_seconds: 60,
            },
        );
        config.switch_service("work").unwrap();
        config.save_to_path(&path).unwrap();

        let reloaded = Config::load_from_path(Some(path));
        assert_eq!(reloaded.active_ai_service, "work");
        let service = reloaded.active_service().unwrap();
        assert_eq!(service.service_type, "anthropic");
        assert_eq!(service.timeout_seconds, 60);
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let service = AiServiceConfig {
            model: String::new(),
            ..AiServiceConfig::default()
        };
        assert!(matches!(
            service.validate(),
            Err(ConfigError::EmptyField("model"))
        ));

        let service = AiServiceConfig {
            timeout_seconds: 0,
            ..AiServiceConfig::default()
        };
        assert!(matches!(service.validate(), Err(ConfigError::InvalidTimeout)));

        assert!(AiServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_switch_unknown_service_fails() {
        let mut config = Config::default();
        assert!(matches!(
            config.switch_service("nope"),
            Err(ConfigError::UnknownService(_))
        ));
        assert_eq!(config.active_ai_service, "local");
    }

    #[test]
    fn test_first_set_service_becomes_active() {
        let mut config = Config {
            ai_services: BTreeMap::new(),
            active_ai_service: String::new(),
            features: Features::default(),
        };
        config.set_service("first", AiServiceConfig::default());
        assert_eq!(config.active_ai_service, "first");
    }
}
