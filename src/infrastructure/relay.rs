//! Presence relay - connection admission and event fan-out
//!
//! The hub owns the only state shared across connections: the membership
//! table. It is mutated exclusively under the `AppState` lock from within
//! message-handling tasks; admission takes the write half so the
//! check-then-admit sequence cannot interleave with another connection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::domain::value_objects::ConnectionId;
use crate::infrastructure::protocol::{ClientMessage, ServerMessage};
use crate::infrastructure::state::AppState;

/// Admission failure; the only fatal-to-the-connection outcome in the
/// protocol. The display text travels verbatim in the `Failed` payload.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("Server is full")]
    ServerFull,
}

/// One admitted connection.
#[derive(Debug)]
struct RelayMember {
    id: ConnectionId,
    /// Channel to send messages to this connection
    sender: mpsc::UnboundedSender<ServerMessage>,
    connected_at: DateTime<Utc>,
}

/// The live set of open connections, bounded by `max_connections`.
pub struct RelayHub {
    members: HashMap<ConnectionId, RelayMember>,
    max_connections: usize,
}

impl RelayHub {
    pub fn new(max_connections: usize) -> Self {
        Self {
            members: HashMap::new(),
            max_connections,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check capacity and admit in one step.
    ///
    /// On success the new connection has already been sent its `Init`
    /// enumeration and every other member a `UserConnect`. On rejection the
    /// membership table is untouched and nobody is notified.
    pub fn try_admit(
        &mut self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, AdmissionError> {
        if self.members.len() >= self.max_connections {
            return Err(AdmissionError::ServerFull);
        }

        let id = ConnectionId::new();
        let existing: Vec<ConnectionId> = self.members.keys().copied().collect();

        if sender
            .send(ServerMessage::Init {
                id,
                users: existing,
            })
            .is_err()
        {
            // Went away between upgrade and admission; nothing to undo.
            return Ok(id);
        }

        self.members.insert(
            id,
            RelayMember {
                id,
                sender,
                connected_at: Utc::now(),
            },
        );
        self.broadcast_except(&ServerMessage::UserConnect { id }, id);

        tracing::info!(
            "Connection {} admitted ({}/{})",
            id,
            self.members.len(),
            self.max_connections
        );
        Ok(id)
    }

    /// Drop a connection from membership, then tell everyone else.
    ///
    /// Removal happens first so no fan-out can route to a closing identity.
    pub fn remove(&mut self, id: ConnectionId) {
        let Some(member) = self.members.remove(&id) else {
            return;
        };
        self.broadcast(&ServerMessage::UserDisconnect { id });
        tracing::info!(
            "Connection {} closed after {}s ({}/{})",
            id,
            (Utc::now() - member.connected_at).num_seconds(),
            self.members.len(),
            self.max_connections
        );
    }

    /// Route one inbound message according to its fan-out rule.
    pub fn dispatch(&self, sender_id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::SpawnPlayer {
                target_id,
                visitor_id,
                scene_key,
                spawn_position,
                spawn_rotation,
            } => {
                // Point-to-point; an unknown target means the peer left
                // between send and delivery, so the request just evaporates.
                self.send_to(
                    target_id,
                    &ServerMessage::SpawnPlayer {
                        visitor_id,
                        scene_key,
                        spawn_position,
                        spawn_rotation,
                    },
                );
            }
            ClientMessage::JoinScene {
                user_id,
                scene_key,
                spawn_position,
                spawn_rotation,
            } => {
                self.broadcast(&ServerMessage::JoinScene {
                    user_id,
                    scene_key,
                    spawn_position,
                    spawn_rotation,
                });
            }
            ClientMessage::UpdatePlayer {
                visitor_id,
                scene_key,
                delta,
                keys_pressed,
                spawn_position,
                spawn_rotation,
            } => {
                // The sender already holds the authoritative state.
                self.broadcast_except(
                    &ServerMessage::UpdatePlayer {
                        visitor_id,
                        scene_key,
                        delta,
                        keys_pressed,
                        spawn_position,
                        spawn_rotation,
                    },
                    sender_id,
                );
            }
        }
    }

    fn send_to(&self, id: ConnectionId, message: &ServerMessage) {
        if let Some(member) = self.members.get(&id) {
            if member.sender.send(message.clone()).is_err() {
                tracing::warn!("Failed to send message to connection {}", member.id);
            }
        }
    }

    fn broadcast(&self, message: &ServerMessage) {
        for member in self.members.values() {
            if member.sender.send(message.clone()).is_err() {
                tracing::warn!("Failed to send message to connection {}", member.id);
            }
        }
    }

    fn broadcast_except(&self, message: &ServerMessage, exclude: ConnectionId) {
        for member in self.members.values() {
            if member.id != exclude {
                if member.sender.send(message.clone()).is_err() {
                    tracing::warn!("Failed to send message to connection {}", member.id);
                }
            }
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create a channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Atomic check-then-admit under the write lock
    let admitted = state.relay.write().await.try_admit(tx);
    let connection_id = match admitted {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Connection rejected: {}", e);
            let failed = ServerMessage::Failed {
                message: e.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&failed) {
                let _ = ws_sender.send(Message::Text(json.into())).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };

    // Forward queued messages (the Init is already in the channel) to the
    // socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    state.relay.read().await.dispatch(connection_id, msg);
                }
                Err(e) => {
                    // Best-effort protocol: malformed input is dropped, not
                    // acknowledged.
                    tracing::warn!("Dropping malformed message from {}: {}", connection_id, e);
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("Connection {} closed by client", connection_id);
                break;
            }
            Ok(_) => {
                // Ping/pong is handled by the protocol layer; binary frames
                // are not part of the catalog.
            }
            Err(e) => {
                tracing::error!("WebSocket error for connection {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Clean up: membership entry goes first, then the disconnect broadcast
    state.relay.write().await.remove(connection_id);

    send_task.abort();
}
