//! Domain entities - presence records with identity

mod npc;
mod player;
mod scene;

pub use npc::{NpcRecord, NpcSpec};
pub use player::{PlayerProfile, PlayerRecord};
pub use scene::{PlayerSnapshot, SceneConfig, SceneMembership, VisitorAttrs};
