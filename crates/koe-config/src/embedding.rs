//! Embedder configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ConfigError, ensure};

/// Which embedding provider the pipeline tries first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote when an API key is configured, otherwise local.
    #[default]
    Auto,
    Remote,
    Local,
    /// Skip providers and use the lexical vectorizer directly.
    Lexical,
}

impl EmbeddingBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Lexical => "lexical",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_batch_size() -> usize {
    100
}

const fn default_ngram_min() -> usize {
    1
}

const fn default_ngram_max() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Texts per provider request, capped by the provider's own limit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Shortest character n-gram of the lexical fallback.
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    /// Longest character n-gram of the lexical fallback.
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Model cache for the local engine. Empty means `~/.koe/cache/fastembed`.
    #[serde(default)]
    pub cache_dir: String,

    #[serde(default)]
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            batch_size: default_batch_size(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            cache_dir: String::new(),
            show_download_progress: false,
        }
    }
}

impl EmbeddingConfig {
    /// Resolved local model cache directory.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        if !self.cache_dir.is_empty() {
            return PathBuf::from(&self.cache_dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".koe")
            .join("cache")
            .join("fastembed")
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            (1..=100).contains(&self.batch_size),
            "embedding.batch_size",
            "must be within 1..=100",
        )?;
        ensure(self.ngram_min >= 1, "embedding.ngram_min", "must be at least 1")?;
        ensure(
            self.ngram_min <= self.ngram_max,
            "embedding.ngram_max",
            "must not be smaller than ngram_min",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.backend, EmbeddingBackend::Auto);
        assert_eq!(config.batch_size, 100);
        assert_eq!((config.ngram_min, config.ngram_max), (1, 3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_cache_dir_is_under_koe() {
        let dir = EmbeddingConfig::default().resolved_cache_dir();
        assert!(dir.ends_with(".koe/cache/fastembed"));
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let config = EmbeddingConfig {
            cache_dir: "/tmp/models".into(),
            ..Default::default()
        };
        assert_eq!(config.resolved_cache_dir(), PathBuf::from("/tmp/models"));
    }

    #[test]
    fn rejects_oversized_batches() {
        let config = EmbeddingConfig {
            batch_size: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
