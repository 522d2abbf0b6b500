//! Generative and embedding provider (Gemini REST) configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ensure};

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_generation_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_embedding_model() -> String {
    "text-embedding-004".into()
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_temperature() -> f32 {
    0.2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// API key. Also read from `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-call timeout for every generation and embedding request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl ProviderConfig {
    /// Whether an API key is available for remote calls.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.timeout_secs >= 1, "provider.timeout_secs", "must be at least 1")?;
        ensure(
            (0.0..=2.0).contains(&self.temperature),
            "provider.temperature",
            "must be within 0.0..=2.0",
        )?;
        ensure(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "provider.base_url",
            "must be an http(s) URL",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = ProviderConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.generation_model, "gemini-2.0-flash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn whitespace_key_is_not_configured() {
        let config = ProviderConfig {
            api_key: "   ".into(),
            ..Default::default()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ProviderConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
