//! Domain layer - Scene-presence state with no transport dependencies
//!
//! This layer contains:
//! - Entities: PlayerRecord, NpcRecord, SceneMembership
//! - Value Objects: ConnectionId, SceneKey, transforms, input snapshots

pub mod entities;
pub mod value_objects;
