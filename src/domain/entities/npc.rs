//! Scripted non-player characters
//!
//! NPCs are created once when a scene is registered and live until process
//! teardown. They never touch the relay protocol.

use crate::domain::value_objects::{AvatarId, Position, Rotation};

/// Static configuration an NPC is created from at scene registration.
#[derive(Debug, Clone)]
pub struct NpcSpec {
    pub username: String,
    pub model_id: u32,
    pub spawn_position: Position,
    pub spawn_rotation: Rotation,
    /// Lines the NPC cycles through when a player interacts with it.
    pub dialog: Vec<String>,
}

impl NpcSpec {
    pub fn new(username: impl Into<String>, model_id: u32) -> Self {
        Self {
            username: username.into(),
            model_id,
            spawn_position: Position::zero(),
            spawn_rotation: Rotation::identity(),
            dialog: Vec::new(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.spawn_position = position;
        self
    }

    pub fn with_dialog(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dialog = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// A live NPC inside one scene.
#[derive(Debug, Clone)]
pub struct NpcRecord {
    pub username: String,
    pub model_id: u32,
    pub position: Position,
    pub rotation: Rotation,
    pub dialog: Vec<String>,
    pub avatar: AvatarId,
    /// Local animation clock, seconds since the scene was registered.
    animation_clock: f32,
}

impl NpcRecord {
    pub fn from_spec(spec: &NpcSpec, avatar: AvatarId) -> Self {
        Self {
            username: spec.username.clone(),
            model_id: spec.model_id,
            position: spec.spawn_position,
            rotation: spec.spawn_rotation,
            dialog: spec.dialog.clone(),
            avatar,
            animation_clock: 0.0,
        }
    }

    /// Advance the NPC's animation clock by one frame.
    pub fn advance(&mut self, delta: f32) {
        self.animation_clock += delta;
    }

    pub fn animation_clock(&self) -> f32 {
        self.animation_clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npc_advance_accumulates_clock() {
        let spec = NpcSpec::new("greeter", 7).with_dialog(["Welcome!"]);
        let mut npc = NpcRecord::from_spec(&spec, AvatarId::from_raw(3));

        npc.advance(0.25);
        npc.advance(0.25);

        assert_eq!(npc.animation_clock(), 0.5);
        assert_eq!(npc.dialog, vec!["Welcome!".to_string()]);
    }
}
