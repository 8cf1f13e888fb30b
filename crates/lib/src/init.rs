//! Initialize the configuration directory: create ~/.instancebot and a
//! template config file to fill in.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"{
  "webhook": {
    "bind": "127.0.0.1",
    "port": 8080
  },
  "discord": {
    "applicationId": "",
    "publicKey": "",
    "guildId": "",
    "requiredRoleId": ""
  },
  "instance": {
    "apiBase": "",
    "region": "",
    "instanceId": ""
  }
}
"#;

/// Ensure the configuration has been initialized (config file exists).
pub fn require_initialized(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `instancebot init` first (config file not found: {})",
            config_path.display()
        );
    }
    Ok(())
}

/// Create the config directory and a template config file if they do not
/// exist. Tokens are expected via DISCORD_BOT_TOKEN / INSTANCE_API_TOKEN
/// rather than the file, so the template omits them.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created template config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}
