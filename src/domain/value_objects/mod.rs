//! Value objects - Immutable objects defined by their attributes

mod ids;
mod scene_key;
mod transform;

pub use ids::{AvatarId, ConnectionId};
pub use scene_key::SceneKey;
pub use transform::{InputSnapshot, Position, Rotation};
