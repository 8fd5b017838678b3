//! Consumer HTTP and WebSocket endpoints

use crate::error::ProtocolViolation;
use crate::ConsumerState;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fwatch_core::codec::decode_events;
use fwatch_core::{ChangeBatch, FileChangeMessage, ProjectWatchConfig, WatchAck, WatchStatusBody};
use serde::Deserialize;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Server-side ping interval on push sessions
const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FileChangesQuery {
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct AckQuery {
    #[serde(rename = "clientUuid", default)]
    client_uuid: Option<String>,
}

pub fn router(state: ConsumerState) -> Router {
    Router::new()
        .route("/api/v1/projects/watchlist", get(watch_list))
        .route("/api/v1/projects/{project_id}/file-changes", post(file_changes))
        .route(
            "/api/v1/projects/{project_id}/file-changes/{watch_state_id}/status",
            put(watch_status),
        )
        .route("/api/v1/projects/{project_id}/watch", put(register).delete(unregister))
        .route("/api/v1/projects/{project_id}/watch/status", get(status))
        .route("/websockets/file-changes/v1", get(push_session))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: ConsumerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Consumer listening on {}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn watch_list(State(state): State<ConsumerState>) -> impl IntoResponse {
    Json(state.registry.watch_list())
}

async fn file_changes(
    State(state): State<ConsumerState>,
    Path(project_id): Path<String>,
    Query(query): Query<FileChangesQuery>,
    Json(body): Json<FileChangeMessage>,
) -> StatusCode {
    let events = match decode_events(&body.msg) {
        Ok(events) => events,
        Err(e) => {
            warn!("Undecodable batch for {}@{}: {}", project_id, query.timestamp, e);
            return StatusCode::BAD_REQUEST;
        }
    };

    // Violations are logged and latched by the sink; the batch is still accepted
    let _ = state.sink.accept(ChangeBatch::new(project_id, query.timestamp, events));
    StatusCode::OK
}

async fn watch_status(
    State(state): State<ConsumerState>,
    Path((project_id, watch_state_id)): Path<(String, String)>,
    Query(query): Query<AckQuery>,
    Json(body): Json<WatchStatusBody>,
) -> StatusCode {
    debug!(
        "Ack from {} for {} ({}): {}",
        query.client_uuid.as_deref().unwrap_or("unknown client"),
        project_id,
        watch_state_id,
        body.success
    );

    let ack = WatchAck {
        project_id,
        watch_state_id,
        success: body.success,
    };
    match state.registry.acknowledge(&ack) {
        Ok(_) => StatusCode::OK,
        Err(ProtocolViolation::AckFlip { .. }) => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn register(
    State(state): State<ConsumerState>,
    Path(project_id): Path<String>,
    Json(mut config): Json<ProjectWatchConfig>,
) -> Result<Json<ProjectWatchConfig>, (StatusCode, String)> {
    config.project_id = project_id;
    state
        .registry
        .register(config)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn unregister(State(state): State<ConsumerState>, Path(project_id): Path<String>) -> StatusCode {
    if state.registry.unregister(&project_id) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn status(
    State(state): State<ConsumerState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .registry
        .status(&project_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn push_session(ws: WebSocketUpgrade, State(state): State<ConsumerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

/// Drain this session's queue into the socket until either side closes
async fn handle_session(mut socket: WebSocket, state: ConsumerState) {
    let (id, mut rx) = state.sessions.register();
    info!("Producer session {} connected", id);

    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(json) = outgoing else { break };
                if let Err(e) = socket.send(Message::Text(Utf8Bytes::from(json))).await {
                    debug!("Failed to push to session {}: {}", id, e);
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if let Err(e) = socket.send(Message::Ping(Default::default())).await {
                    debug!("Failed to ping session {}: {}", id, e);
                    break;
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    // Keep-alive `{}` and anything else from the producer is ignored
                    Some(Ok(Message::Text(text))) => debug!("Session {} sent {} bytes", id, text.as_str().len()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Session {} errored: {}", id, e);
                        break;
                    }
                }
            }
        }
    }

    state.sessions.unregister(id);
    info!("Producer session {} disconnected", id);
}
