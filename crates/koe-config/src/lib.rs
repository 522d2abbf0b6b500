//! # koe-config
//!
//! Layered configuration loading for koe using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`KOE_*` prefix, `__` as separator)
//! 2. `GEMINI_API_KEY` (mapped to `provider.api_key`)
//! 3. Project-level `./koe.toml`
//! 4. User-level `~/.config/koe/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `KOE_PROVIDER__API_KEY` -> `provider.api_key`,
//! `KOE_CLUSTERING__K_MAX` -> `clustering.k_max`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use koe_config::KoeConfig;
//!
//! // Load from all sources (dotenvy + TOML + env):
//! let config = KoeConfig::load_with_dotenv().expect("config");
//!
//! if config.provider.is_configured() {
//!     println!("Generation model: {}", config.provider.generation_model);
//! }
//! ```

mod clustering;
mod embedding;
mod error;
mod general;
mod issues;
mod naming;
mod outlier;
mod projection;
mod provider;
mod sentiment;

pub use clustering::{ClusterStrategy, ClusteringConfig};
pub use embedding::{EmbeddingBackend, EmbeddingConfig};
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use issues::IssuesConfig;
pub use naming::{NamingConfig, is_placeholder_label};
pub use outlier::OutlierConfig;
pub use projection::ProjectionConfig;
pub use provider::ProviderConfig;
pub use sentiment::SentimentConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = "koe.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KoeConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub outlier: OutlierConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub issues: IssuesConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl KoeConfig {
    /// Load configuration from all sources (TOML files + environment variables)
    /// and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source cannot be parsed or a
    /// value has the wrong type, and [`ConfigError::InvalidValue`] when a
    /// value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Calls `dotenvy` to load the nearest `.env` file (current directory or
    /// any parent) before building the figment. This is the typical entry
    /// point for the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Conventional provider key
        figment = figment.merge(
            Env::raw()
                .only(&["GEMINI_API_KEY"])
                .map(|_| "provider.api_key".into()),
        );

        // Layer 4: Environment variables (highest priority)
        figment = figment.merge(Env::prefixed("KOE_").split("__"));

        figment
    }

    /// Check every section for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::InvalidValue`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.embedding.validate()?;
        self.outlier.validate()?;
        self.clustering.validate()?;
        self.projection.validate()?;
        self.naming.validate()?;
        self.issues.validate()?;
        self.sentiment.validate()
    }

    /// Path to the user-global config file.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("koe").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KoeConfig::default();
        assert!(!config.provider.is_configured());
        assert!(!config.sentiment.enabled);
        assert_eq!(config.issues.total_items(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: KoeConfig = KoeConfig::figment().extract()?;
            assert_eq!(config.clustering.k_max, 20);
            assert_eq!(config.naming.small_voice_label, "Small Voice");
            Ok(())
        });
    }

    #[test]
    fn validate_reports_field() {
        let mut config = KoeConfig::default();
        config.naming.max_workers = 5;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "naming.max_workers");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
