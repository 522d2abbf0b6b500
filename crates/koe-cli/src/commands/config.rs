use anyhow::Context;
use koe_config::{KoeConfig, LOCAL_CONFIG_FILE};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ConfigCommands;
use crate::output;

#[derive(Debug, Serialize)]
struct ConfigLocation {
    scope: &'static str,
    path: String,
    exists: bool,
}

/// Handle `koe config`.
pub fn handle(action: &ConfigCommands, config: &KoeConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            let rendered = toml::to_string_pretty(&masked(config))
                .context("failed to serialize configuration")?;
            output::write_text(rendered.trim_end(), flags)
        }
        ConfigCommands::Path => output::emit(&locations(), flags),
    }
}

/// Copy of `config` safe to print.
fn masked(config: &KoeConfig) -> KoeConfig {
    let mut config = config.clone();
    let key = &config.provider.api_key;
    if !key.is_empty() {
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        config.provider.api_key = if key.chars().count() > 8 {
            format!("****{tail}")
        } else {
            String::from("****")
        };
    }
    config
}

fn locations() -> Vec<ConfigLocation> {
    let mut out = Vec::with_capacity(2);
    if let Some(global) = KoeConfig::global_config_path() {
        out.push(ConfigLocation {
            scope: "global",
            exists: global.exists(),
            path: global.display().to_string(),
        });
    }
    out.push(ConfigLocation {
        scope: "local",
        exists: std::path::Path::new(LOCAL_CONFIG_FILE).exists(),
        path: LOCAL_CONFIG_FILE.to_string(),
    });
    out
}
