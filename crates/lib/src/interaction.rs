//! Interaction wire types: the inbound webhook payload, the control command
//! enum, and the response envelope.

use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

/// InteractionType.Ping
pub const INTERACTION_TYPE_PING: u8 = 1;
/// InteractionType.ApplicationCommand
pub const INTERACTION_TYPE_APPLICATION_COMMAND: u8 = 2;

/// Inbound interaction payload (webhook POST body).
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub member: Option<Member>,
}

/// Invoked command data: the option list as delivered on the wire.
#[derive(Debug, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: serde_json::Value,
}

impl CommandData {
    /// Option list -> map of name to string value. Non-string option values
    /// are skipped; a command with no options yields an empty map.
    pub fn options_map(&self) -> HashMap<String, String> {
        self.options
            .iter()
            .filter_map(|o| o.value.as_str().map(|v| (o.name.clone(), v.to_string())))
            .collect()
    }
}

/// Guild member who invoked the command.
#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub roles: Vec<String>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub username: String,
}

impl Member {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }
}

/// The four control tokens the slash command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Reboot,
    Status,
}

impl ControlCommand {
    /// Parse a control token. Unrecognized tokens return None; the caller
    /// answers those with an explicit unknown-command reply.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reboot" => Some(Self::Reboot),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reboot => "reboot",
            Self::Status => "status",
        }
    }
}

/// Outbound interaction response: Pong for a Ping, or a channel message with
/// source for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionResponse {
    Pong,
    ChannelMessage(String),
}

impl InteractionResponse {
    /// Serialize to the wire envelope: `{"type":1}` or
    /// `{"type":4,"data":{"content":...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Pong => json!({ "type": 1 }),
            Self::ChannelMessage(text) => json!({
                "type": 4,
                "data": { "content": text }
            }),
        }
    }
}
