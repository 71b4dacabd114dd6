//! HTTP/WebSocket control plane.
//!
//! Reads are public; `POST /api/inject` requires a bearer token when one is
//! configured. Handlers never touch a lock shared with the simulation worker
//! across an `.await`.

pub mod control;

pub use control::{ControlPlane, MetricsReport};

use crate::app::shutdown::ShutdownManager;
use arkhe_data::{InjectOutcome, InjectRequest, SystemStatus};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Server state shared by every handler.
pub struct AppState {
    pub control: ControlPlane,
    /// API key for the write endpoint (None = open mode)
    pub api_key: Option<String>,
    pub shutdown: Arc<ShutdownManager>,
}

impl AppState {
    pub fn new(control: ControlPlane, api_key: Option<String>, shutdown: Arc<ShutdownManager>) -> Self {
        Self {
            control,
            api_key,
            shutdown,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/inject", post(inject_signal))
        .route("/api/stats", get(get_stats))
        .route("/api/agents/:id", get(get_agent))
        .route("/api/field/cell", get(get_cell))
        .route("/api/metrics", get(get_metrics))
        .route("/ws", get(websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until the shutdown manager fires, then drains in-flight requests.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let shutdown = Arc::clone(&state.shutdown);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;
    Ok(())
}

fn unavailable(state: &AppState) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({
            "error": state.control.unavailable_reason().unwrap_or_default()
        })),
    )
        .into_response()
}

/// Validate API key from Authorization header.
/// Returns None if auth passes, Some(Response) with 401 if it fails.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    let expected = state.api_key.as_ref()?;

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "));

    match token {
        Some(t) if t == expected => None,
        _ => {
            tracing::warn!("Rejected injection: invalid or missing API key");
            Some(
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": "invalid or missing API key" })),
                )
                    .into_response(),
            )
        }
    }
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.control.get_system_status())
}

async fn inject_signal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<InjectRequest>,
) -> Response {
    if let Some(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let outcome = if state.shutdown.is_shutdown_requested() {
        InjectOutcome::Rejected {
            reason: "simulation is shutting down".to_string(),
        }
    } else {
        state.control.inject_field_signal(request)
    };

    let status = match &outcome {
        InjectOutcome::Queued { .. } => StatusCode::ACCEPTED,
        InjectOutcome::Ignored { reason } => {
            tracing::debug!("Ignored injection: {}", reason);
            StatusCode::OK
        }
        InjectOutcome::Rejected { .. } | InjectOutcome::Unavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(outcome)).into_response()
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Response {
    match state.control.stats() {
        Some(stats) => Json(stats).into_response(),
        None => unavailable(&state),
    }
}

async fn get_agent(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let lookup = match u32::try_from(id) {
        Ok(id) => state.control.agent_info(id),
        // Ids outside u32 name no agent.
        Err(_) => state.control.snapshot().map(|_| None),
    };
    match lookup {
        Some(Some(info)) => Json(info).into_response(),
        Some(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("agent {id} not found") })),
        )
            .into_response(),
        None => unavailable(&state),
    }
}

#[derive(Debug, Deserialize)]
struct CellQuery {
    x: f64,
    y: f64,
    z: f64,
}

async fn get_cell(State(state): State<Arc<AppState>>, Query(q): Query<CellQuery>) -> Response {
    match state.control.cell(q.x, q.y, q.z) {
        Some(reading) => Json(reading).into_response(),
        None => unavailable(&state),
    }
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.control.metrics() {
        Some(report) => Json(report).into_response(),
        None => unavailable(&state),
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| telemetry_stream(socket, state))
}

/// Pushes one status frame per published snapshot until the client leaves
/// or the process shuts down.
async fn telemetry_stream(stream: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();
    let client_id = Uuid::new_v4();
    tracing::info!("Telemetry client connected: {}", client_id);

    if let Ok(msg_str) = serde_json::to_string(&state.control.get_system_status()) {
        let _ = sender.send(Message::Text(msg_str)).await;
    }

    let Some(coordinator) = state.control.coordinator().cloned() else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let mut rx = coordinator.subscribe();
    let shutdown = Arc::clone(&state.shutdown);
    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = shutdown.wait() => break,
                frame = rx.recv() => frame,
            };
            match frame {
                Ok(snapshot) => {
                    let status = SystemStatus::operational(&snapshot.stats, snapshot.tick, true);
                    let Ok(msg_str) = serde_json::to_string(&status) else {
                        continue;
                    };
                    if sender.send(Message::Text(msg_str)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Telemetry client {} skipped {} frames", client_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Drain client messages until it closes or the sender gives up.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();
    tracing::info!("Telemetry client disconnected: {}", client_id);
}
