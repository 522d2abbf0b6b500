//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed file and env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use koe_config::{ClusterStrategy, EmbeddingBackend, KoeConfig};

#[test]
fn loads_provider_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[provider]
api_key = "toml-key"
base_url = "http://localhost:8080/v1beta"
generation_model = "gemini-2.5-flash"
timeout_secs = 30
temperature = 0.0
"#,
        )?;

        let config: KoeConfig = Figment::from(Serialized::defaults(KoeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.provider.api_key, "toml-key");
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1beta");
        assert_eq!(config.provider.generation_model, "gemini-2.5-flash");
        assert_eq!(config.provider.embedding_model, "text-embedding-004");
        assert_eq!(config.provider.timeout_secs, 30);
        assert!(config.provider.is_configured());
        Ok(())
    });
}

#[test]
fn loads_analysis_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[embedding]
backend = "lexical"
ngram_max = 4

[outlier]
contamination = 0.05

[clustering]
strategy = "partition"
k_search = false
k_min = 2
k_max = 8

[projection]
jitter = 0.02

[naming]
small_voice_label = "少数意見"

[issues]
majority_items = 3
small_voice_items = 2

[sentiment]
enabled = true

[general]
seed = 7
language = "English"
"#,
        )?;

        let config: KoeConfig = Figment::from(Serialized::defaults(KoeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.embedding.backend, EmbeddingBackend::Lexical);
        assert_eq!(config.embedding.ngram_max, 4);
        assert!((config.outlier.contamination - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.clustering.strategy, ClusterStrategy::Partition);
        assert!(!config.clustering.k_search);
        assert_eq!((config.clustering.k_min, config.clustering.k_max), (2, 8));
        assert!((config.projection.jitter - 0.02).abs() < f32::EPSILON);
        assert_eq!(config.naming.small_voice_label, "少数意見");
        assert_eq!(config.issues.total_items(), 5);
        assert!(config.sentiment.enabled);
        assert_eq!(config.general.seed, 7);
        assert_eq!(config.general.language, "English");
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn local_koe_toml_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "koe.toml",
            r#"
[clustering]
k_max = 12
"#,
        )?;

        let config = KoeConfig::load().expect("config loads");
        assert_eq!(config.clustering.k_max, 12);
        Ok(())
    });
}

#[test]
fn out_of_range_toml_value_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "koe.toml",
            r#"
[issues]
majority_items = 9
"#,
        )?;

        let err = KoeConfig::load().expect_err("validation should fail");
        assert!(err.to_string().contains("issues.majority_items"));
        Ok(())
    });
}

#[test]
fn unknown_backend_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "koe.toml",
            r#"
[embedding]
backend = "quantum"
"#,
        )?;

        let err = KoeConfig::load().expect_err("unknown variant");
        assert!(matches!(err, koe_config::ConfigError::Figment(_)));
        Ok(())
    });
}
