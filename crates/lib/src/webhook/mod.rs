//! Webhook server: the Discord interactions endpoint.
//!
//! One HTTP port serves a health probe and `POST /interactions`. Every
//! request is verified, dispatched, and answered synchronously; nothing is
//! persisted between requests.

mod command;
mod server;

pub use command::{
    handle_application_command, CommandError, REPLY_ALREADY_RUNNING, REPLY_ALREADY_STOPPED,
    REPLY_DENIED, REPLY_REBOOTING, REPLY_STARTING, REPLY_STATUS_RUNNING, REPLY_STATUS_STOPPED,
    REPLY_STOPPING, REPLY_UNKNOWN_COMMAND,
};
pub use server::{build_router, run_server, WebhookState};
