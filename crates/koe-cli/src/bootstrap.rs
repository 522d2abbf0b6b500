use anyhow::Context;
use koe_config::KoeConfig;

/// Load `.env`, config files, and `KOE_*` overrides.
pub fn load_config() -> anyhow::Result<KoeConfig> {
    let config = KoeConfig::load_with_dotenv().context("failed to load koe configuration")?;
    if !config.provider.is_configured() {
        tracing::info!("no API key configured; naming and agenda will use fallbacks");
    }
    Ok(config)
}
