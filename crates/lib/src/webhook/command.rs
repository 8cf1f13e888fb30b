//! Application command handling: authorization, state query, and the
//! four-way control dispatch.

use crate::instance::{InstanceController, InstanceError};
use crate::interaction::{ControlCommand, Interaction, InteractionResponse};

pub const REPLY_DENIED: &str =
    "Only members with the server moderator role can control the server.";
pub const REPLY_UNKNOWN_COMMAND: &str = "Unknown control command.";
pub const REPLY_ALREADY_RUNNING: &str =
    "The server is already running.\nIf something is wrong, try a reboot.";
pub const REPLY_STARTING: &str =
    "Starting the server.\nThis takes a few minutes; a channel message will announce when it is ready.";
pub const REPLY_ALREADY_STOPPED: &str = "The server is already stopped.";
pub const REPLY_STOPPING: &str = "Stopping the server.";
pub const REPLY_REBOOTING: &str =
    "Rebooting the server.\nThis takes a few minutes; a channel message will announce when it is ready.";
pub const REPLY_STATUS_RUNNING: &str = "The server is running.";
pub const REPLY_STATUS_STOPPED: &str = "The server is stopped.";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Type-2 interaction without member or command data.
    #[error("application command is missing member or command data")]
    Malformed,
    #[error(transparent)]
    Instance(#[from] InstanceError),
}

/// Handle a verified ApplicationCommand interaction.
///
/// Authorization runs before anything else: a caller without the required
/// role gets the denial reply and no instance call is made, not even a
/// describe. Unknown or missing control tokens also answer without touching
/// the instance. Controller failures propagate to the server for a 500.
pub async fn handle_application_command(
    required_role_id: &str,
    instance: &dyn InstanceController,
    interaction: &Interaction,
) -> Result<InteractionResponse, CommandError> {
    let member = interaction.member.as_ref().ok_or(CommandError::Malformed)?;
    let data = interaction.data.as_ref().ok_or(CommandError::Malformed)?;

    if !member.has_role(required_role_id) {
        log::info!(
            "denied control command from user without required role: {}",
            member.user.username
        );
        return Ok(InteractionResponse::ChannelMessage(REPLY_DENIED.to_string()));
    }

    let options = data.options_map();
    let command = match options.get("control").and_then(|v| ControlCommand::parse(v)) {
        Some(c) => c,
        None => {
            log::info!(
                "unknown control token from {}: {:?}",
                member.user.username,
                options.get("control")
            );
            return Ok(InteractionResponse::ChannelMessage(
                REPLY_UNKNOWN_COMMAND.to_string(),
            ));
        }
    };

    log::info!("{} requested {}", member.user.username, command.as_str());
    let text = execute_command(instance, command).await?;
    Ok(InteractionResponse::ChannelMessage(text.to_string()))
}

/// Query current state, then issue at most one lifecycle call.
async fn execute_command(
    instance: &dyn InstanceController,
    command: ControlCommand,
) -> Result<&'static str, InstanceError> {
    let state = instance.describe().await?;
    let text = match command {
        ControlCommand::Start => {
            if state.is_running() {
                REPLY_ALREADY_RUNNING
            } else {
                instance.start().await?;
                REPLY_STARTING
            }
        }
        ControlCommand::Stop => {
            if state.is_stopped() {
                REPLY_ALREADY_STOPPED
            } else {
                instance.stop().await?;
                REPLY_STOPPING
            }
        }
        ControlCommand::Reboot => {
            // A stopped instance cannot reboot; starting it is the designed
            // equivalent, with the same reply as start.
            if state.is_stopped() {
                instance.start().await?;
                REPLY_STARTING
            } else {
                instance.reboot().await?;
                REPLY_REBOOTING
            }
        }
        ControlCommand::Status => {
            // Every non-stopped state reads as "running" to users.
            if state.is_stopped() {
                REPLY_STATUS_STOPPED
            } else {
                REPLY_STATUS_RUNNING
            }
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceState;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ROLE: &str = "role-mod";

    /// Records every controller call and reports a fixed state.
    struct FakeInstance {
        state: InstanceState,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeInstance {
        fn new(state: InstanceState) -> Self {
            Self {
                state,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InstanceController for FakeInstance {
        async fn describe(&self) -> Result<InstanceState, InstanceError> {
            self.calls.lock().unwrap().push("describe");
            Ok(self.state)
        }
        async fn start(&self) -> Result<(), InstanceError> {
            self.calls.lock().unwrap().push("start");
            Ok(())
        }
        async fn stop(&self) -> Result<(), InstanceError> {
            self.calls.lock().unwrap().push("stop");
            Ok(())
        }
        async fn reboot(&self) -> Result<(), InstanceError> {
            self.calls.lock().unwrap().push("reboot");
            Ok(())
        }
    }

    fn command_interaction(control: &str, roles: &[&str]) -> Interaction {
        let raw = serde_json::json!({
            "type": 2,
            "data": {"options": [{"name": "control", "value": control}]},
            "member": {
                "roles": roles,
                "user": {"id": "42", "username": "alice"}
            }
        });
        serde_json::from_value(raw).expect("build interaction")
    }

    async fn run(
        instance: &FakeInstance,
        control: &str,
        roles: &[&str],
    ) -> InteractionResponse {
        let interaction = command_interaction(control, roles);
        handle_application_command(ROLE, instance, &interaction)
            .await
            .expect("command handled")
    }

    fn message(text: &str) -> InteractionResponse {
        InteractionResponse::ChannelMessage(text.to_string())
    }

    #[tokio::test]
    async fn missing_role_is_denied_with_zero_calls() {
        let instance = FakeInstance::new(InstanceState::Running);
        for control in ["start", "stop", "reboot", "status", "bogus"] {
            let res = run(&instance, control, &["other-role"]).await;
            assert_eq!(res, message(REPLY_DENIED));
        }
        assert!(instance.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_control_answers_without_instance_calls() {
        let instance = FakeInstance::new(InstanceState::Running);
        let res = run(&instance, "restart", &[ROLE]).await;
        assert_eq!(res, message(REPLY_UNKNOWN_COMMAND));
        assert!(instance.calls().is_empty());
    }

    #[tokio::test]
    async fn start_when_running_makes_no_start_call() {
        let instance = FakeInstance::new(InstanceState::Running);
        let res = run(&instance, "start", &[ROLE]).await;
        assert_eq!(res, message(REPLY_ALREADY_RUNNING));
        assert_eq!(instance.calls(), vec!["describe"]);
    }

    #[tokio::test]
    async fn start_when_stopped_starts_once() {
        let instance = FakeInstance::new(InstanceState::Stopped);
        let res = run(&instance, "start", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STARTING));
        assert_eq!(instance.calls(), vec!["describe", "start"]);
    }

    #[tokio::test]
    async fn start_when_pending_still_starts() {
        // Transitional states count as "not running" for start.
        let instance = FakeInstance::new(InstanceState::Pending);
        let res = run(&instance, "start", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STARTING));
        assert_eq!(instance.calls(), vec!["describe", "start"]);
    }

    #[tokio::test]
    async fn stop_when_stopped_makes_no_stop_call() {
        let instance = FakeInstance::new(InstanceState::Stopped);
        let res = run(&instance, "stop", &[ROLE]).await;
        assert_eq!(res, message(REPLY_ALREADY_STOPPED));
        assert_eq!(instance.calls(), vec!["describe"]);
    }

    #[tokio::test]
    async fn stop_when_running_stops_once() {
        let instance = FakeInstance::new(InstanceState::Running);
        let res = run(&instance, "stop", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STOPPING));
        assert_eq!(instance.calls(), vec!["describe", "stop"]);
    }

    #[tokio::test]
    async fn stop_when_stopping_still_stops() {
        let instance = FakeInstance::new(InstanceState::Stopping);
        let res = run(&instance, "stop", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STOPPING));
        assert_eq!(instance.calls(), vec!["describe", "stop"]);
    }

    #[tokio::test]
    async fn reboot_when_stopped_starts_instead() {
        let instance = FakeInstance::new(InstanceState::Stopped);
        let res = run(&instance, "reboot", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STARTING));
        assert_eq!(instance.calls(), vec!["describe", "start"]);
    }

    #[tokio::test]
    async fn reboot_when_running_reboots() {
        let instance = FakeInstance::new(InstanceState::Running);
        let res = run(&instance, "reboot", &[ROLE]).await;
        assert_eq!(res, message(REPLY_REBOOTING));
        assert_eq!(instance.calls(), vec!["describe", "reboot"]);
    }

    #[tokio::test]
    async fn status_collapses_non_stopped_states_to_running() {
        for state in [
            InstanceState::Running,
            InstanceState::Pending,
            InstanceState::Stopping,
            InstanceState::ShuttingDown,
        ] {
            let instance = FakeInstance::new(state);
            let res = run(&instance, "status", &[ROLE]).await;
            assert_eq!(res, message(REPLY_STATUS_RUNNING), "{:?}", state);
            assert_eq!(instance.calls(), vec!["describe"]);
        }
        let instance = FakeInstance::new(InstanceState::Stopped);
        let res = run(&instance, "status", &[ROLE]).await;
        assert_eq!(res, message(REPLY_STATUS_STOPPED));
        assert_eq!(instance.calls(), vec!["describe"]);
    }

    #[tokio::test]
    async fn missing_member_is_malformed() {
        let instance = FakeInstance::new(InstanceState::Running);
        let interaction: Interaction =
            serde_json::from_str(r#"{"type":2,"data":{"options":[]}}"#).expect("parse");
        let err = handle_application_command(ROLE, &instance, &interaction)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Malformed));
        assert!(instance.calls().is_empty());
    }

    #[tokio::test]
    async fn describe_failure_propagates() {
        struct FailingInstance;
        #[async_trait]
        impl InstanceController for FailingInstance {
            async fn describe(&self) -> Result<InstanceState, InstanceError> {
                Err(InstanceError::Api("describe i-0123: 503".to_string()))
            }
            async fn start(&self) -> Result<(), InstanceError> {
                Ok(())
            }
            async fn stop(&self) -> Result<(), InstanceError> {
                Ok(())
            }
            async fn reboot(&self) -> Result<(), InstanceError> {
                Ok(())
            }
        }
        let interaction = command_interaction("status", &[ROLE]);
        let err = handle_application_command(ROLE, &FailingInstance, &interaction)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Instance(_)));
    }
}
