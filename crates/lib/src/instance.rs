//! Compute instance controller: state model, controller trait, and the HTTP
//! client for the provider's instance lifecycle API.

use async_trait::async_trait;
use serde::Deserialize;

/// Lifecycle states reported by the provider. Only `Running` and `Stopped`
/// drive branching; every transitional state counts as "not running" and
/// "not stopped".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    /// State string the provider added after this enum was written.
    Unknown,
}

impl InstanceState {
    pub fn from_provider(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_stopped(self) -> bool {
        self == Self::Stopped
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("instance api request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("instance api error: {0}")]
    Api(String),
}

/// Controller for the single configured instance. Seam for the provider API
/// so the command path can be tested against a recording fake.
#[async_trait]
pub trait InstanceController: Send + Sync {
    /// Current lifecycle state of the instance.
    async fn describe(&self) -> Result<InstanceState, InstanceError>;
    /// Issue a start. Asynchronous on the provider side; readiness is
    /// signaled out-of-band.
    async fn start(&self) -> Result<(), InstanceError>;
    /// Issue a stop.
    async fn stop(&self) -> Result<(), InstanceError>;
    /// Issue a reboot. Only valid on a non-stopped instance.
    async fn reboot(&self) -> Result<(), InstanceError>;
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    state: String,
}

/// Instance controller speaking the provider's REST API.
#[derive(Clone)]
pub struct HttpInstanceController {
    api_base: String,
    region: String,
    instance_id: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpInstanceController {
    pub fn new(
        api_base: &str,
        region: &str,
        instance_id: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            region: region.to_string(),
            instance_id: instance_id.to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn instance_url(&self) -> String {
        format!(
            "{}/{}/instances/{}",
            self.api_base, self.region, self.instance_id
        )
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// POST an action endpoint (start/stop/reboot) and check for 2xx.
    async fn post_action(&self, action: &str) -> Result<(), InstanceError> {
        let url = format!("{}/{}", self.instance_url(), action);
        let res = self.with_auth(self.client.post(&url)).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(InstanceError::Api(format!(
                "{} {}: {} {}",
                action, self.instance_id, status, body
            )));
        }
        log::info!("instance {}: {} issued", self.instance_id, action);
        Ok(())
    }
}

#[async_trait]
impl InstanceController for HttpInstanceController {
    async fn describe(&self) -> Result<InstanceState, InstanceError> {
        let url = self.instance_url();
        let res = self.with_auth(self.client.get(&url)).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(InstanceError::Api(format!(
                "describe {}: {} {}",
                self.instance_id, status, body
            )));
        }
        let data: DescribeResponse = res.json().await?;
        let state = InstanceState::from_provider(&data.state);
        log::debug!("instance {} state: {:?}", self.instance_id, state);
        Ok(state)
    }

    async fn start(&self) -> Result<(), InstanceError> {
        self.post_action("start").await
    }

    async fn stop(&self) -> Result<(), InstanceError> {
        self.post_action("stop").await
    }

    async fn reboot(&self) -> Result<(), InstanceError> {
        self.post_action("reboot").await
    }
}
