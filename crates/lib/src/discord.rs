//! Discord REST client: guild-scoped slash command registration.

use serde_json::json;

const USER_AGENT: &str = "instancebot";

/// Name of the single registered slash command.
pub const COMMAND_NAME: &str = "server";
/// Name of the command's single required option.
pub const CONTROL_OPTION: &str = "control";

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("bot token not configured")]
    MissingToken,
    #[error("discord request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("discord api error: {0}")]
    Api(String),
}

/// Client for the Discord REST API. Only used outbound, for command
/// registration.
#[derive(Clone)]
pub struct DiscordClient {
    api_base: String,
    token: Option<String>,
    application_id: String,
    client: reqwest::Client,
}

/// The `/server` command definition: one required string option with the
/// four control choices. Option type 3 = STRING.
pub fn control_command_definition() -> serde_json::Value {
    json!({
        "name": COMMAND_NAME,
        "description": "Control the game server instance",
        "options": [
            {
                "name": CONTROL_OPTION,
                "description": "What to do with the server",
                "type": 3,
                "required": true,
                "choices": [
                    { "name": "Start", "value": "start" },
                    { "name": "Stop", "value": "stop" },
                    { "name": "Reboot", "value": "reboot" },
                    { "name": "Status", "value": "status" }
                ]
            }
        ]
    })
}

impl DiscordClient {
    pub fn new(api_base: &str, token: Option<String>, application_id: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            application_id: application_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Upsert the `/server` command in the guild's command registry. Discord
    /// overwrites an existing command with the same name, so re-registering
    /// on every Ping is harmless.
    pub async fn register_guild_commands(&self, guild_id: &str) -> Result<(), DiscordError> {
        let token = self.token.as_ref().ok_or(DiscordError::MissingToken)?;
        let url = format!(
            "{}/applications/{}/guilds/{}/commands",
            self.api_base, self.application_id, guild_id
        );
        log::info!("registering commands: {}", url);
        let res = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bot {}", token))
            .json(&control_command_definition())
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DiscordError::Api(format!(
                "command registration failed: {} {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ControlCommand;

    #[test]
    fn command_definition_shape() {
        let def = control_command_definition();
        assert_eq!(def["name"], COMMAND_NAME);
        let options = def["options"].as_array().expect("options array");
        assert_eq!(options.len(), 1);
        let control = &options[0];
        assert_eq!(control["name"], CONTROL_OPTION);
        assert_eq!(control["type"], 3);
        assert_eq!(control["required"], true);
        let choices = control["choices"].as_array().expect("choices array");
        assert_eq!(choices.len(), 4);
        // Every choice value must be a parseable control token.
        for choice in choices {
            let value = choice["value"].as_str().expect("string value");
            assert!(ControlCommand::parse(value).is_some(), "{}", value);
        }
    }

    #[tokio::test]
    async fn register_without_token_fails() {
        let client = DiscordClient::new("https://discord.com/api/v8", None, "app");
        let err = client.register_guild_commands("guild").await.unwrap_err();
        assert!(matches!(err, DiscordError::MissingToken));
    }
}
