//! HTTP and WebSocket handlers

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::protocol::{ClientAction, Outbound, ServerFrame, SessionEventFrame};
use crate::error::DebateError;
use crate::multiplexer::Subscription;
use crate::registry::ConnectionRegistry;
use crate::types::SessionId;

/// Frames buffered between a connection's tasks and its socket writer
const OUTBOUND_CAPACITY: usize = 256;

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Registered sessions
    pub sessions: usize,
}

/// Build the gateway router
pub fn router(registry: ConnectionRegistry) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .with_state(registry)
}

async fn health_handler(State(registry): State<ConnectionRegistry>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: registry.manager().session_count().await,
    })
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<ConnectionRegistry>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

/// Handle one WebSocket connection
async fn handle_socket(socket: WebSocket, registry: ConnectionRegistry) {
    let connection_id = Uuid::new_v4().to_string();
    log::info!("WebSocket connection established: {connection_id}");

    let (mut sink, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);

    // Single writer; everything else goes through out_tx
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    log::warn!("Failed to serialize frame: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                log::debug!("[{connection_id}] Received: {text}");
                forwarders.retain(|handle| !handle.is_finished());
                let keep_going =
                    handle_action(&registry, &connection_id, &text, &out_tx, &mut forwarders)
                        .await;
                if !keep_going {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("[{connection_id}] WebSocket error: {e}");
                break;
            }
        }
    }

    for handle in forwarders {
        handle.abort();
    }
    let cancelled = registry.cleanup_connection(&connection_id).await;
    log::info!("Connection {connection_id} closed: cleaned up {cancelled} session(s)");

    drop(out_tx);
    let _ = writer.await;
}

/// Dispatch one client message; `false` once the socket writer is gone
async fn handle_action(
    registry: &ConnectionRegistry,
    connection_id: &str,
    text: &str,
    out_tx: &mpsc::Sender<Outbound>,
    forwarders: &mut Vec<JoinHandle<()>>,
) -> bool {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            let error = DebateError::invalid_request(format!("malformed action: {e}"));
            return send(out_tx, ServerFrame::error(None, &error)).await;
        }
    };

    let manager = registry.manager();
    let reply = match action {
        ClientAction::Start { prompt, agents } => {
            let agents = agents.unwrap_or_else(|| manager.options().default_agents.clone());
            let started = manager.start_session(prompt, agents.clone()).await;
            match started {
                Ok(session_id) => {
                    registry.register_session(connection_id, session_id.clone()).await;
                    let frame = ServerFrame::SessionStarted {
                        session_id: session_id.clone(),
                        agents,
                    };
                    if !send(out_tx, frame).await {
                        return false;
                    }
                    match manager.subscribe(&session_id).await {
                        Ok(subscription) => {
                            forwarders.push(spawn_forwarder(session_id, subscription, out_tx.clone()));
                            return true;
                        }
                        Err(e) => ServerFrame::error(Some(session_id), &e),
                    }
                }
                Err(e) => ServerFrame::error(None, &e),
            }
        }
        ClientAction::Subscribe { session_id } => match manager.subscribe(&session_id).await {
            Ok(subscription) => {
                forwarders.push(spawn_forwarder(session_id, subscription, out_tx.clone()));
                return true;
            }
            Err(e) => ServerFrame::error(Some(session_id), &e),
        },
        ClientAction::Cancel { session_id } => match manager.cancel_session(&session_id).await {
            Ok(()) => ServerFrame::CancelRequested { session_id },
            Err(e) => ServerFrame::error(Some(session_id), &e),
        },
        ClientAction::Status { session_id } => match manager.get_status(&session_id).await {
            Ok(snapshot) => ServerFrame::Status { snapshot },
            Err(e) => ServerFrame::error(Some(session_id), &e),
        },
        ClientAction::CheckAuth => ServerFrame::AuthStatus {
            agents: manager.check_agents().await,
        },
        ClientAction::Ping => ServerFrame::Pong,
    };

    send(out_tx, reply).await
}

async fn send(out_tx: &mpsc::Sender<Outbound>, frame: ServerFrame) -> bool {
    out_tx.send(frame.into()).await.is_ok()
}

/// Copy one subscription onto the connection until it ends
///
/// A slow socket backs up this task, which in turn overflows the
/// subscription and gets it disconnected by the multiplexer.
fn spawn_forwarder(
    session_id: SessionId,
    mut subscription: Subscription,
    out_tx: mpsc::Sender<Outbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match subscription.recv().await {
                Ok(Some(event)) => {
                    let frame = SessionEventFrame {
                        session_id: session_id.clone(),
                        event,
                    };
                    if out_tx.send(frame.into()).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[{session_id}] Subscription dropped: {e}");
                    let _ = out_tx
                        .send(ServerFrame::error(Some(session_id.clone()), &e).into())
                        .await;
                    break;
                }
            }
        }
    })
}
