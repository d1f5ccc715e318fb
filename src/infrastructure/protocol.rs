//! Wire protocol for the presence relay
//!
//! Message types are aligned between the relay and its clients. Every
//! payload is a closed tagged union; anything that fails to deserialize is
//! dropped at the receiving boundary with a warn log, never trusted at the
//! call site.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConnectionId, InputSnapshot, Position, Rotation, SceneKey};

/// Messages from a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask the relay to tell `target_id` to spawn `visitor_id` in a scene.
    /// Routed point-to-point to the target connection only.
    SpawnPlayer {
        target_id: ConnectionId,
        visitor_id: ConnectionId,
        scene_key: SceneKey,
        #[serde(default)]
        spawn_position: Option<Position>,
        #[serde(default)]
        spawn_rotation: Option<Rotation>,
    },
    /// Announce that `user_id` now lives in `scene_key`. Broadcast to every
    /// connection including the sender, so all membership tables react
    /// identically.
    JoinScene {
        user_id: ConnectionId,
        scene_key: SceneKey,
        spawn_position: Position,
        spawn_rotation: Rotation,
    },
    /// Per-tick state snapshot for the sender's authoritative avatar.
    /// Broadcast to everyone except the sender. Absent transforms mean the
    /// avatar has not moved.
    UpdatePlayer {
        visitor_id: ConnectionId,
        scene_key: SceneKey,
        delta: f32,
        keys_pressed: InputSnapshot,
        #[serde(default)]
        spawn_position: Option<Position>,
        #[serde(default)]
        spawn_rotation: Option<Rotation>,
    },
}

/// Messages from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once on admission: the assigned identity plus everyone already
    /// present.
    Init {
        id: ConnectionId,
        users: Vec<ConnectionId>,
    },
    /// Admission rejected; the connection is closed immediately after.
    Failed { message: String },
    /// A new connection was admitted (not sent to the new connection itself).
    UserConnect { id: ConnectionId },
    /// A connection closed (sent to everyone else).
    UserDisconnect { id: ConnectionId },
    /// Point-to-point spawn request forwarded from a peer.
    SpawnPlayer {
        visitor_id: ConnectionId,
        scene_key: SceneKey,
        #[serde(default)]
        spawn_position: Option<Position>,
        #[serde(default)]
        spawn_rotation: Option<Rotation>,
    },
    /// Scene membership announcement, relayed to all connections.
    JoinScene {
        user_id: ConnectionId,
        scene_key: SceneKey,
        spawn_position: Position,
        spawn_rotation: Rotation,
    },
    /// Peer state snapshot, relayed to everyone but the sender.
    UpdatePlayer {
        visitor_id: ConnectionId,
        scene_key: SceneKey,
        delta: f32,
        keys_pressed: InputSnapshot,
        #[serde(default)]
        spawn_position: Option<Position>,
        #[serde(default)]
        spawn_rotation: Option<Rotation>,
    },
}
