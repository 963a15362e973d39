//! WebSocket connection lifecycle and inbound event dispatch.

use super::protocol::{ClientCommand, OutboundEvent};
use crate::broadcast::ClientConnection;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use vigil_core::logbook::AuditEntry;
use vigil_core::mode::Mode;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Registers the connection, spawns its send pump, and runs the receive
/// loop until the client disconnects. Payload and handler errors never close
/// the connection; only transport-level failures do.
#[instrument(name = "ws_connection", skip_all, fields(conn_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4();
    tracing::Span::current().record("conn_id", conn_id.to_string());
    info!("client connected");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<OutboundEvent>();
    state
        .broadcaster
        .attach(ClientConnection::new(conn_id, event_tx));

    // The pump is the only writer on this socket: events queued by `publish`
    // from any thread drain here, in queue order.
    let send_pump = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "failed to serialize outbound event");
                    continue;
                }
            };
            if socket_tx.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(incoming) = socket_rx.next().await {
        match incoming {
            Ok(Message::Binary(data)) => {
                // Raw sensor frame. Kept as-is; whoever consumes the slot
                // decodes it and drops it there if it is malformed.
                state.frames.set_latest(data);
            }
            Ok(Message::Text(text)) => handle_text(&state, text.as_str()),
            Ok(Message::Close(_)) => {
                info!("client sent close frame");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!(error = %e, "websocket transport error");
                break;
            }
        }
    }

    state.broadcaster.detach(conn_id);
    send_pump.abort();
    info!("client disconnected");
}

/// Parses one structured message and dispatches it. Malformed payloads are
/// dropped with a warning; the receive loop carries on.
pub(crate) fn handle_text(state: &Arc<AppState>, text: &str) {
    let command = match ClientCommand::parse(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "dropping malformed client message");
            return;
        }
    };

    state.logbook.record(AuditEntry::info(
        format!("Event:[{}] received from client", command.label()),
        format!("[PAYLOAD]: {text}"),
    ));

    // The dispatcher only runs for an attached connection, but teardown can
    // race a final message in; commands act only while attached.
    if !state.broadcaster.is_attached() {
        return;
    }

    dispatch(state, command);
}

/// Routes one recognized command. Every arm swallows its own faults; a bad
/// command never takes the connection down.
pub(crate) fn dispatch(state: &Arc<AppState>, command: ClientCommand) {
    match command {
        ClientCommand::StartThinking { transcript } => {
            let state = Arc::clone(state);
            tokio::spawn(async move {
                match state.thinker.think(&transcript).await {
                    Ok(reply) => {
                        state
                            .broadcaster
                            .publish(Mode::from("start-speaking"), Some(Value::String(reply)));
                    }
                    Err(e) => {
                        error!(error = ?e, "think failed");
                        state
                            .logbook
                            .record(AuditEntry::error("Think error", e.to_string()));
                    }
                }
            });
        }
        ClientCommand::BackToIdle => {
            // Deliberately bypasses the controller's single-instance guard:
            // this path and a control-plane start can yield two live sensing
            // loops sharing one cancel flag, exactly as the system has
            // always behaved.
            let sensing = Arc::clone(&state.sensing);
            let cancel = state.worker.cancel_flag();
            let logbook = Arc::clone(&state.logbook);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = sensing.run(&cancel) {
                    error!(error = ?e, "presence loop fault");
                    logbook.record(AuditEntry::error("Presence detection error", e.to_string()));
                }
            });
        }
        ClientCommand::Speaking => state.mode.set(Mode::Speaking),
        ClientCommand::InfoLog { event, detail } => {
            state.logbook.record(AuditEntry::info(event, detail));
        }
        ClientCommand::ConversationLog(entry) => {
            state.logbook.record_conversation(entry);
        }
        ClientCommand::SaveLogs => {
            let state = Arc::clone(state);
            tokio::spawn(async move {
                persist_logs(&state).await;
            });
        }
        ClientCommand::Error { detail } => {
            state.mode.set(Mode::Error);
            state
                .logbook
                .record(AuditEntry::error("error", detail_text(detail)));
            let state = Arc::clone(state);
            tokio::spawn(async move {
                persist_logs(&state).await;
            });
        }
        ClientCommand::Unknown { event } => {
            debug!(event = %event, "ignoring unrecognized client event");
        }
    }
}

async fn persist_logs(state: &AppState) {
    let batch = state.logbook.drain();
    if let Err(e) = state.sink.persist(batch).await {
        error!(error = ?e, "failed to persist log batch");
    }
}

fn detail_text(detail: Option<Value>) -> String {
    match detail {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
