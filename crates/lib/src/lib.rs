//! Instancebot core library — config, signature verification, interaction
//! types, Discord client, instance controller, and the webhook server used
//! by the CLI binary.

pub mod config;
pub mod discord;
pub mod init;
pub mod instance;
pub mod interaction;
pub mod verify;
pub mod webhook;
