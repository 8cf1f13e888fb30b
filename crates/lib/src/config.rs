//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g.
//! `~/.instancebot/config.json`) and environment. The resulting struct is
//! immutable and passed by reference into the webhook server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Discord application settings (ids, keys, token).
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Target compute instance settings.
    #[serde(default)]
    pub instance: InstanceConfig,
}

/// Webhook bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Port for the interactions endpoint (default 8080).
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"; a reverse proxy or gateway in
    /// front is expected for TLS).
    #[serde(default = "default_webhook_bind")]
    pub bind: String,
}

fn default_webhook_port() -> u16 {
    8080
}

fn default_webhook_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: default_webhook_port(),
            bind: default_webhook_bind(),
        }
    }
}

/// Discord application config: API base, credentials, and the ids the
/// handler needs (application, guild, required role).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Discord REST API base (default "https://discord.com/api/v8").
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,

    /// Bot token used for command registration. Overridden by
    /// DISCORD_BOT_TOKEN env when set.
    pub bot_token: Option<String>,

    /// Application (client) id.
    pub application_id: Option<String>,

    /// Application public key (64-digit hex Ed25519) used to verify
    /// interaction signatures.
    pub public_key: Option<String>,

    /// Guild id scoping command registration.
    pub guild_id: Option<String>,

    /// Role id a member must hold to control the instance.
    pub required_role_id: Option<String>,
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v8".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: default_discord_api_base(),
            bot_token: None,
            application_id: None,
            public_key: None,
            guild_id: None,
            required_role_id: None,
        }
    }
}

/// Target instance config: provider API base, region, instance id, token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Compute provider REST API base (e.g. "https://compute.example.com/v1").
    pub api_base: Option<String>,

    /// Region the instance lives in.
    pub region: Option<String>,

    /// Id of the single instance this bot controls.
    pub instance_id: Option<String>,

    /// Bearer token for the provider API. Overridden by INSTANCE_API_TOKEN
    /// env when set.
    pub api_token: Option<String>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Discord bot token: env DISCORD_BOT_TOKEN overrides config.
pub fn resolve_bot_token(config: &Config) -> Option<String> {
    env_nonempty("DISCORD_BOT_TOKEN").or_else(|| {
        config
            .discord
            .bot_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the instance API token: env INSTANCE_API_TOKEN overrides config.
pub fn resolve_instance_token(config: &Config) -> Option<String> {
    env_nonempty("INSTANCE_API_TOKEN").or_else(|| {
        config
            .instance
            .api_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Validate that the fields the webhook server cannot run without are set.
/// Token fields are allowed to be absent (registration then fails loudly at
/// call time), but ids and the public key must be present up front.
pub fn require_webhook_config(config: &Config) -> Result<()> {
    fn need(field: &Option<String>, name: &str) -> Result<()> {
        match field.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(()),
            _ => anyhow::bail!("missing required config field: {}", name),
        }
    }
    need(&config.discord.public_key, "discord.publicKey")?;
    need(&config.discord.application_id, "discord.applicationId")?;
    need(&config.discord.guild_id, "discord.guildId")?;
    need(&config.discord.required_role_id, "discord.requiredRoleId")?;
    need(&config.instance.api_base, "instance.apiBase")?;
    need(&config.instance.region, "instance.region")?;
    need(&config.instance.instance_id, "instance.instanceId")?;
    Ok(())
}

/// Resolve config path from env or default (~/.instancebot/config.json).
pub fn default_config_path() -> PathBuf {
    std::env::var("INSTANCEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".instancebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or INSTANCEBOT_CONFIG_PATH). Missing
/// file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
