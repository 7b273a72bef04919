//! Per-connection control loop: admission, inbound moves, cleanup.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use dropfour_core::{ConnectionId, MoveRequest, ServerMessage, SessionId};
use dropfour_settings::ServerSettings;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::participant::Participant;
use crate::registry::SessionRegistry;

/// Per-connection knobs taken from [`ServerSettings`].
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Outbound queue depth.
    pub max_send_queue: usize,
    /// Interval between Ping frames.
    pub heartbeat_interval: Duration,
    /// Silence after which the connection is dropped.
    pub heartbeat_timeout: Duration,
    /// Send `Move rejected` notices to the mover.
    pub notify_rejections: bool,
}

impl From<&ServerSettings> for ConnectionConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            max_send_queue: s.max_send_queue,
            heartbeat_interval: Duration::from_secs(s.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(s.heartbeat_timeout_secs),
            notify_rejections: s.notify_rejections,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

/// Run one client from upgrade to disconnect.
///
/// 1. Admits the connection into `session_id`; a full session gets a close
///    frame and nothing else
/// 2. Forwards queued frames to the socket and pings on an interval
/// 3. Applies inbound moves; malformed frames and illegal moves are dropped
/// 4. Removes the connection from the registry on every exit path
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_connection(
    socket: WebSocket,
    session_id: SessionId,
    registry: Arc<SessionRegistry>,
    config: ConnectionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.max_send_queue);
    let participant = Arc::new(Participant::new(ConnectionId::new(), send_tx));
    let conn_id = participant.id.clone();

    let admission = match registry.admit(&session_id, Arc::clone(&participant)) {
        Ok(admission) => admission,
        Err(e) => {
            info!(conn_id = %conn_id, error = %e, "connection refused");
            let _ = ws_tx
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "session is full".into(),
                })))
                .await;
            return;
        }
    };
    info!(conn_id = %conn_id, player = %admission.player, "connection established");

    // Outbound forwarder with periodic Ping frames.
    let writer_participant = Arc::clone(&participant);
    let heartbeat_interval = config.heartbeat_interval;
    let heartbeat_timeout = config.heartbeat_timeout;
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(frame) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&frame).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if writer_participant.idle_for() > heartbeat_timeout {
                        warn!(conn_id = %writer_participant.id, "client unresponsive for {heartbeat_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(conn_id = %conn_id, error = %e, "read failed");
                    break;
                }
            };
            participant.mark_alive();

            let text = match msg {
                Message::Text(t) => t.as_str().to_owned(),
                Message::Binary(data) => {
                    if let Ok(s) = std::str::from_utf8(&data) {
                        s.to_owned()
                    } else {
                        debug!(conn_id = %conn_id, len = data.len(), "ignoring non-UTF8 binary frame");
                        continue;
                    }
                }
                Message::Close(_) => {
                    debug!(conn_id = %conn_id, "client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            handle_text(&text, &session_id, &participant, &registry, config.notify_rejections);
        }
    };

    tokio::select! {
        () = reader => {}
        _ = &mut writer => debug!(conn_id = %conn_id, "writer finished"),
        () = shutdown.cancelled() => debug!(conn_id = %conn_id, "server shutting down"),
    }

    writer.abort();
    let removed = registry.remove(&session_id, &conn_id);
    info!(
        conn_id = %conn_id,
        removed,
        dropped = participant.drop_count(),
        duration_secs = participant.age().as_secs(),
        "connection closed"
    );
}

/// Decode and apply one inbound text frame.
fn handle_text(
    text: &str,
    session_id: &SessionId,
    participant: &Participant,
    registry: &SessionRegistry,
    notify_rejections: bool,
) {
    trace!(conn_id = %participant.id, text, "received frame");
    let request = match MoveRequest::parse(text) {
        Ok(request) => request,
        Err(e) => {
            debug!(conn_id = %participant.id, error = %e, "ignoring malformed message");
            return;
        }
    };

    if let Err(e) = registry.apply_move(session_id, &participant.id, request.column) {
        debug!(
            conn_id = %participant.id,
            column = request.column,
            reason = e.kind(),
            "move rejected"
        );
        if notify_rejections {
            let _ = participant.send_message(&ServerMessage::MoveRejected {
                reason: e.to_string(),
            });
        }
    }
}
