//! Webhook HTTP server: signature gate, interaction dispatch, health probe.

use crate::config::{self, Config};
use crate::discord::DiscordClient;
use crate::instance::{HttpInstanceController, InstanceController};
use crate::interaction::{
    Interaction, InteractionResponse, INTERACTION_TYPE_APPLICATION_COMMAND, INTERACTION_TYPE_PING,
};
use crate::verify::SignatureVerifier;
use crate::webhook::command::{handle_application_command, CommandError};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the webhook server (config, verifier, clients).
/// Immutable after startup; cloned into each request handler.
#[derive(Clone)]
pub struct WebhookState {
    pub config: Arc<Config>,
    pub verifier: Arc<SignatureVerifier>,
    pub discord: Arc<DiscordClient>,
    pub instance: Arc<dyn InstanceController>,
}

/// Build the router. Exposed so tests can serve it with a fake instance
/// controller.
pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/interactions", post(interactions))
        .with_state(state)
}

/// Run the webhook server until SIGINT or SIGTERM.
pub async fn run_server(config: Config) -> Result<()> {
    config::require_webhook_config(&config)?;

    let public_key = config
        .discord
        .public_key
        .as_deref()
        .context("missing discord.publicKey")?;
    let verifier =
        SignatureVerifier::from_hex(public_key).context("parsing discord.publicKey")?;

    let application_id = config
        .discord
        .application_id
        .as_deref()
        .context("missing discord.applicationId")?;
    let bot_token = config::resolve_bot_token(&config);
    if bot_token.is_none() {
        log::warn!("no bot token configured; command registration will fail until DISCORD_BOT_TOKEN is set");
    }
    let discord = DiscordClient::new(&config.discord.api_base, bot_token, application_id);

    let instance = HttpInstanceController::new(
        config
            .instance
            .api_base
            .as_deref()
            .context("missing instance.apiBase")?,
        config
            .instance
            .region
            .as_deref()
            .context("missing instance.region")?,
        config
            .instance
            .instance_id
            .as_deref()
            .context("missing instance.instanceId")?,
        config::resolve_instance_token(&config),
    );

    let bind_addr = format!("{}:{}", config.webhook.bind.trim(), config.webhook.port);
    let state = WebhookState {
        config: Arc::new(config),
        verifier: Arc::new(verifier),
        discord: Arc::new(discord),
        instance: Arc::new(instance),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("webhook stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /interactions — verify the request signature, then dispatch on the
/// interaction type.
async fn interactions(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // HeaderMap lookups are case-insensitive, which covers gateways that
    // rewrite header casing on the way in.
    let signature = headers
        .get("x-signature-ed25519")
        .and_then(|v| v.to_str().ok());
    let timestamp = headers
        .get("x-signature-timestamp")
        .and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        log::info!("rejecting interaction without signature headers");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !state.verifier.verify(signature, timestamp, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => {
            log::info!("rejecting malformed interaction body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed interaction body" })),
            )
                .into_response();
        }
    };

    match interaction.kind {
        INTERACTION_TYPE_PING => handle_ping(&state).await,
        INTERACTION_TYPE_APPLICATION_COMMAND => handle_command(&state, &interaction).await,
        other => {
            log::info!("rejecting unsupported interaction type: {}", other);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "unsupported interaction type" })),
            )
                .into_response()
        }
    }
}

/// Ping doubles as the registration bootstrap: re-upsert the guild command,
/// then answer Pong. A registration failure is logged but does not fail the
/// Pong — Discord needs the Pong to keep the endpoint active, and the next
/// Ping retries the upsert.
async fn handle_ping(state: &WebhookState) -> Response {
    let guild_id = state.config.discord.guild_id.as_deref().unwrap_or_default();
    if let Err(e) = state.discord.register_guild_commands(guild_id).await {
        log::warn!("command registration failed (next ping retries): {}", e);
    }
    (StatusCode::OK, Json(InteractionResponse::Pong.to_json())).into_response()
}

async fn handle_command(state: &WebhookState, interaction: &Interaction) -> Response {
    let required_role = state
        .config
        .discord
        .required_role_id
        .as_deref()
        .unwrap_or_default();
    match handle_application_command(required_role, state.instance.as_ref(), interaction).await {
        Ok(res) => (StatusCode::OK, Json(res.to_json())).into_response(),
        Err(CommandError::Malformed) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "malformed application command" })),
        )
            .into_response(),
        Err(CommandError::Instance(e)) => {
            log::error!("instance control failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "instance control failed" })),
            )
                .into_response()
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.webhook.port,
    }))
}
