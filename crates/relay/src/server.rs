//! HTTP server for the alert relay.
//!
//! Provides REST API endpoints for:
//! - Receiving Alertmanager webhooks
//! - Health checks
//! - Schedule and mute administration

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use oncall::{EscalationError, EscalationScheduler, ScheduleEntry};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::alert::AlertBatch;
use crate::commands::{CommandHandler, CommandReply};
use crate::worker::AlertSink;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Destination for decoded alert batches.
    pub sink: AlertSink,
    /// Schedule and mute state.
    pub scheduler: Arc<EscalationScheduler>,
    /// Operator command runner.
    pub commands: Arc<CommandHandler>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/alert", post(alert_handler))
        .route("/health", get(health_handler))
        .route("/api/schedule", get(schedule_handler))
        .route("/api/command", post(command_handler))
        .route("/api/mute", post(mute_handler).delete(unmute_handler))
        .route("/api/call-success", post(call_success_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on all interfaces until Ctrl-C.
pub async fn run_server(app: Router, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port, "Alert relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ============================================================================
// Handlers
// ============================================================================

/// Handle an Alertmanager webhook.
///
/// The body is decoded by hand so malformed JSON maps to 400 regardless of
/// the request's content type.
async fn alert_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let batch: AlertBatch = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Failed to parse alert payload");
        StatusCode::BAD_REQUEST
    })?;

    let count = batch.alerts.len();
    info!(alerts = count, "Received alert batch");

    match state.sink.submit(batch.alerts).await {
        Ok(Some(report)) => Ok(Json(json!({
            "status": "processed",
            "alerts": count,
            "report": report
        }))),
        Ok(None) => Ok(Json(json!({
            "status": "accepted",
            "alerts": count
        }))),
        Err(e) => {
            error!(error = %e, "Failed to enqueue alert batch");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Health check endpoint.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn schedule_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleEntry>>, StatusCode> {
    state
        .scheduler
        .list_schedule()
        .await
        .map(Json)
        .map_err(internal_error)
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    text: String,
}

async fn command_handler(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandReply> {
    Json(state.commands.handle(&request.text).await)
}

#[derive(Debug, Default, Deserialize)]
struct MuteRequest {
    #[serde(default)]
    minutes: Option<i64>,
}

/// Mute calls. An empty body mutes for the configured default.
async fn mute_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let request: MuteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MuteRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse mute request");
            StatusCode::BAD_REQUEST
        })?
    };

    let until = match request.minutes {
        None => state.scheduler.mute().await,
        Some(minutes) if minutes > 0 => state.scheduler.set_mute(Duration::minutes(minutes)).await,
        Some(minutes) => {
            warn!(minutes, "Rejected non-positive mute duration");
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    .map_err(internal_error)?;

    Ok(Json(json!({
        "status": "muted",
        "muted_until": until.to_rfc3339()
    })))
}

async fn unmute_handler(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    state.scheduler.unmute().await.map_err(internal_error)?;
    Ok(Json(json!({ "status": "unmuted" })))
}

#[derive(Debug, Deserialize)]
struct CallSuccessRequest {
    number: String,
}

/// Provider callback: a call to `number` was answered.
async fn call_success_handler(
    State(state): State<AppState>,
    Json(request): Json<CallSuccessRequest>,
) -> Result<Json<Value>, StatusCode> {
    let number = request.number.trim();
    if number.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .scheduler
        .record_call_success(number)
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({ "status": "recorded", "number": number })))
}

#[allow(clippy::needless_pass_by_value)]
fn internal_error(e: EscalationError) -> StatusCode {
    error!(error = %e, "Escalation state request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
