//! `.env` loading runs in its own test binary: dotenvy writes straight into
//! the process environment, which the other config tests must not observe.

use figment::Jail;
use koe_config::KoeConfig;

#[test]
fn dotenv_values_flow_through_figment() {
    Jail::expect_with(|jail| {
        jail.create_file(
            ".env",
            "KOE_NAMING__SMALL_VOICE_LABEL=Minority\nKOE_GENERAL__SUMMARY_CHARS=40\n",
        )?;

        let config = KoeConfig::load_with_dotenv().expect("config loads");
        assert_eq!(config.naming.small_voice_label, "Minority");
        assert_eq!(config.general.summary_chars, 40);
        Ok(())
    });
}
