use figment::Jail;
use koe_config::{EmbeddingBackend, KoeConfig};
use pretty_assertions::assert_eq;

#[test]
fn prefixed_env_vars_override_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("KOE_CLUSTERING__K_MAX", "9");
        jail.set_env("KOE_EMBEDDING__BACKEND", "local");
        jail.set_env("KOE_SENTIMENT__ENABLED", "true");

        let config = KoeConfig::load().expect("config loads");
        assert_eq!(config.clustering.k_max, 9);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
        assert!(config.sentiment.enabled);
        Ok(())
    });
}

#[test]
fn gemini_api_key_maps_to_provider() {
    Jail::expect_with(|jail| {
        jail.set_env("GEMINI_API_KEY", "from-gemini-var");

        let config = KoeConfig::load().expect("config loads");
        assert_eq!(config.provider.api_key, "from-gemini-var");
        Ok(())
    });
}

#[test]
fn koe_key_beats_gemini_key() {
    Jail::expect_with(|jail| {
        jail.set_env("GEMINI_API_KEY", "from-gemini-var");
        jail.set_env("KOE_PROVIDER__API_KEY", "from-koe-var");

        let config = KoeConfig::load().expect("config loads");
        assert_eq!(config.provider.api_key, "from-koe-var");
        Ok(())
    });
}

#[test]
fn env_beats_local_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "koe.toml",
            r#"
[general]
seed = 1
language = "English"
"#,
        )?;
        jail.set_env("KOE_GENERAL__SEED", "99");

        let config = KoeConfig::load().expect("config loads");
        assert_eq!(config.general.seed, 99);
        assert_eq!(config.general.language, "English");
        Ok(())
    });
}
