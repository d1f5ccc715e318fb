//! Scene identification

use serde::{Deserialize, Serialize};

/// Closed set of registered scenes.
///
/// The only valid argument to scene-registry lookups; unknown keys cannot be
/// expressed on the client side, and wire payloads carrying anything else
/// fail deserialization and are dropped at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneKey {
    MeetingRoom,
    ChatRoom,
}

impl SceneKey {
    /// All keys, in registration order.
    pub fn all() -> [SceneKey; 2] {
        [SceneKey::MeetingRoom, SceneKey::ChatRoom]
    }
}

impl std::fmt::Display for SceneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneKey::MeetingRoom => write!(f, "meeting-room"),
            SceneKey::ChatRoom => write!(f, "chat-room"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_key_wire_form() {
        let json = serde_json::to_string(&SceneKey::MeetingRoom).unwrap();
        assert_eq!(json, "\"meeting-room\"");

        let key: SceneKey = serde_json::from_str("\"chat-room\"").unwrap();
        assert_eq!(key, SceneKey::ChatRoom);
    }

    #[test]
    fn test_unknown_scene_key_rejected() {
        let result = serde_json::from_str::<SceneKey>("\"broom-closet\"");
        assert!(result.is_err());
    }
}
