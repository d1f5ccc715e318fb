//! Outbound ports - narrow interfaces to external collaborators
//!
//! Rendering and transport internals are out of scope; the session layer
//! drives them through these traits only.

use crate::domain::value_objects::{AvatarId, Position, Rotation, SceneKey};
use crate::infrastructure::protocol::ClientMessage;

/// Rendering collaborator owning the avatar arena.
///
/// Scene state never holds renderer objects; it holds [`AvatarId`] keys and
/// asks the renderer to act on them.
pub trait AvatarRenderer {
    /// Create a renderable avatar and return its arena key.
    fn spawn_avatar(
        &mut self,
        scene: SceneKey,
        username: &str,
        model_id: u32,
        position: Position,
        rotation: Rotation,
    ) -> AvatarId;

    /// Tear down an avatar's resources. Unknown keys are ignored.
    fn despawn_avatar(&mut self, avatar: AvatarId);

    /// Uniform scale, used by the transition hand-off animation.
    fn set_avatar_scale(&mut self, avatar: AvatarId, scale: f32);

    /// Reposition an avatar after a simulation step or received snapshot.
    fn move_avatar(&mut self, avatar: AvatarId, position: Position, rotation: Rotation);
}

/// Transport handle for messages bound to the relay.
///
/// Delivery is best effort, at most once; implementations drop messages on a
/// closed connection rather than surfacing errors into scene state.
pub trait RelayOutbound {
    fn send(&self, message: ClientMessage);
}
