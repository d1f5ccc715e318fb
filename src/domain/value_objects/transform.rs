//! Spatial value objects shared between scene state and the wire protocol
//!
//! Positions travel as `[x, y, z]` arrays and rotations as `[x, y, z, w]`
//! quaternion arrays, matching what peers feed straight into their render
//! collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Origin of a scene; the fallback spawn point.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f32; 3]> for Position {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Position> for [f32; 3] {
    fn from(p: Position) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Orientation quaternion, `[x, y, z, w]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Rotation {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f32; 4]> for Rotation {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rotation> for [f32; 4] {
    fn from(r: Rotation) -> Self {
        [r.x, r.y, r.z, r.w]
    }
}

/// Point-in-time snapshot of a participant's pressed control keys.
///
/// Keyed by the control name ("w", "a", "s", "d", ...); a missing entry is
/// equivalent to `false`. BTreeMap keeps the wire form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSnapshot(pub BTreeMap<String, bool>);

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn press(&mut self, key: &str) {
        self.0.insert(key.to_string(), true);
    }

    pub fn release(&mut self, key: &str) {
        self.0.remove(key);
    }
}
