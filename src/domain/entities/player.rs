//! Player records - one per participant present in a scene

use chrono::{DateTime, Utc};

use crate::domain::value_objects::{AvatarId, ConnectionId, InputSnapshot, Position, Rotation};

/// Planar walk speed applied when advancing the local participant.
const WALK_SPEED: f32 = 2.0;

/// Display attributes a participant carries into every scene it enters.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub username: String,
    pub model_id: u32,
}

impl PlayerProfile {
    pub fn new(username: impl Into<String>, model_id: u32) -> Self {
        Self {
            username: username.into(),
            model_id,
        }
    }
}

/// A participant currently present in one scene.
///
/// Owned exclusively by the scene that contains it. The local record is the
/// only one whose movement is simulated here; visitor records are driven by
/// received update snapshots (last write wins).
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: ConnectionId,
    pub username: String,
    pub model_id: u32,
    pub is_local: bool,
    pub position: Position,
    pub rotation: Rotation,
    pub input: InputSnapshot,
    /// Handle into the renderer's avatar arena.
    pub avatar: AvatarId,
    pub joined_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn new(
        id: ConnectionId,
        profile: &PlayerProfile,
        is_local: bool,
        position: Position,
        rotation: Rotation,
        avatar: AvatarId,
    ) -> Self {
        Self {
            id,
            username: profile.username.clone(),
            model_id: profile.model_id,
            is_local,
            position,
            rotation,
            input: InputSnapshot::empty(),
            avatar,
            joined_at: Utc::now(),
        }
    }

    /// Advance the local participant's movement from its input snapshot.
    ///
    /// Stand-in for the out-of-scope physics collaborator: planar WASD
    /// displacement at a fixed walk speed.
    pub fn advance_local(&mut self, delta: f32) {
        let step = WALK_SPEED * delta;
        if self.input.is_pressed("w") {
            self.position.z -= step;
        }
        if self.input.is_pressed("s") {
            self.position.z += step;
        }
        if self.input.is_pressed("a") {
            self.position.x -= step;
        }
        if self.input.is_pressed("d") {
            self.position.x += step;
        }
    }

    /// Apply a received update snapshot to a visitor record.
    ///
    /// No sequence numbers are carried on the wire, so this is last write
    /// wins: a stale snapshot arriving late overwrites a fresher one.
    pub fn apply_snapshot(&mut self, position: Position, rotation: Rotation, input: InputSnapshot) {
        self.position = position;
        self.rotation = rotation;
        self.input = input;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_record() -> PlayerRecord {
        PlayerRecord::new(
            ConnectionId::new(),
            &PlayerProfile::new("ada", 1),
            true,
            Position::zero(),
            Rotation::identity(),
            AvatarId::from_raw(0),
        )
    }

    #[test]
    fn test_advance_local_moves_along_pressed_axes() {
        let mut record = local_record();
        record.input.press("w");
        record.input.press("d");

        record.advance_local(0.5);

        assert_eq!(record.position.z, -1.0);
        assert_eq!(record.position.x, 1.0);
        assert_eq!(record.position.y, 0.0);
    }

    #[test]
    fn test_advance_local_without_input_is_stationary() {
        let mut record = local_record();
        record.advance_local(1.0);
        assert_eq!(record.position, Position::zero());
    }

    #[test]
    fn test_apply_snapshot_overwrites_in_place() {
        let mut record = local_record();
        let mut input = InputSnapshot::empty();
        input.press("a");

        record.apply_snapshot(
            Position::new(1.0, 0.0, -2.0),
            Rotation::new(0.0, 1.0, 0.0, 0.0),
            input.clone(),
        );

        assert_eq!(record.position, Position::new(1.0, 0.0, -2.0));
        assert_eq!(record.input, input);
    }
}
