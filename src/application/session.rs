//! Client session management
//!
//! A [`Session`] is the single point of truth for "which scene am I in, and
//! who am I". It owns the scene registry, the active-scene pointer, and the
//! transition controller, and turns relay events into membership mutations.
//! It is an explicitly constructed context object: the application entry
//! point builds one and passes it wherever it is needed.
//!
//! Everything here is synchronous; the caller interleaves `tick` and
//! `handle_event` on one task, so there is no locking and no data race
//! inside one client's state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ports::{AvatarRenderer, RelayOutbound};
use crate::application::transition::TransitionController;
use crate::domain::entities::{PlayerProfile, SceneConfig, SceneMembership, VisitorAttrs};
use crate::domain::value_objects::{ConnectionId, SceneKey};
use crate::infrastructure::protocol::{ClientMessage, ServerMessage};

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Double initialization would wire relay listeners and the render loop
    /// twice; setup must abort.
    #[error("session is already initialized")]
    AlreadyInitialized,
}

/// Process-wide session state for one connected client.
pub struct Session {
    outbound: Arc<dyn RelayOutbound>,
    /// Installed once by `initialize`; doubles as the initialized flag.
    renderer: Option<Box<dyn AvatarRenderer>>,
    profile: PlayerProfile,
    local_identity: Option<ConnectionId>,
    active_scene: Option<SceneKey>,
    scenes: HashMap<SceneKey, SceneMembership>,
    transition: TransitionController,
}

impl Session {
    pub fn new(outbound: Arc<dyn RelayOutbound>, profile: PlayerProfile) -> Self {
        Self {
            outbound,
            renderer: None,
            profile,
            local_identity: None,
            active_scene: None,
            scenes: HashMap::new(),
            transition: TransitionController::new(),
        }
    }

    /// Install the rendering collaborator. Calling this twice is a
    /// programmer error and aborts setup.
    pub fn initialize(&mut self, renderer: Box<dyn AvatarRenderer>) -> Result<(), SessionError> {
        if self.renderer.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }
        self.renderer = Some(renderer);
        tracing::info!("Session initialized");
        Ok(())
    }

    pub fn local_identity(&self) -> Option<ConnectionId> {
        self.local_identity
    }

    pub fn active_scene(&self) -> Option<SceneKey> {
        self.active_scene
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_transitioning()
    }

    pub fn scene(&self, key: SceneKey) -> Option<&SceneMembership> {
        self.scenes.get(&key)
    }

    /// Insert a scene into the registry.
    ///
    /// Re-registering a key overwrites the previous membership table, NPCs
    /// included; the warn log surfaces it. Must run after `initialize` so
    /// NPC avatars can be spawned.
    pub fn register_scene(&mut self, config: SceneConfig) {
        let Some(renderer) = self.renderer.as_deref_mut() else {
            tracing::warn!("Cannot register {} before initialization", config.key);
            return;
        };

        let key = config.key;
        let membership = SceneMembership::new(config, renderer);
        if self.scenes.insert(key, membership).is_some() {
            tracing::warn!("Scene {} re-registered; previous membership discarded", key);
        } else {
            tracing::info!("Registered scene {}", key);
        }
    }

    /// Switch the active scene.
    ///
    /// Unregistered keys are a logged no-op. When the local avatar is live
    /// in the current scene the switch goes through the transition
    /// controller and the pointer mutates only at hand-off completion;
    /// otherwise the switch is immediate.
    pub fn set_active_scene(&mut self, key: SceneKey) {
        if !self.scenes.contains_key(&key) {
            tracing::warn!("Scene {} not registered", key);
            return;
        }
        if self.active_scene == Some(key) {
            return;
        }

        let live_avatar = self
            .active_scene
            .and_then(|current| self.scenes.get(&current))
            .and_then(|scene| scene.local_player().map(|p| (scene.key(), p.avatar)));

        match live_avatar {
            Some((from, avatar)) => {
                let Some(renderer) = self.renderer.as_deref_mut() else {
                    return;
                };
                self.transition.begin(from, key, avatar, renderer);
            }
            None => self.enter_scene(key),
        }
    }

    /// Dispatch one relay event into membership state.
    pub fn handle_event(&mut self, event: ServerMessage) {
        match event {
            ServerMessage::Init { id, users } => {
                tracing::info!("Connected as {} ({} peers online)", id, users.len());
                self.local_identity = Some(id);

                // The active scene may have been chosen before the relay
                // handed out an identity; enter it properly now.
                if let Some(active) = self.active_scene {
                    self.enter_scene(active);
                }
            }

            ServerMessage::Failed { message } => {
                tracing::error!("Relay rejected connection: {}", message);
            }

            ServerMessage::UserConnect { id } => {
                let (Some(local), Some(active)) = (self.local_identity, self.active_scene) else {
                    tracing::debug!("Peer {} connected before session was ready", id);
                    return;
                };

                // Tell the newcomer where our avatar lives, then show theirs
                // in our active scene.
                let transform = self
                    .scenes
                    .get(&active)
                    .and_then(|scene| scene.local_player())
                    .map(|p| (p.position, p.rotation));
                self.outbound.send(ClientMessage::SpawnPlayer {
                    target_id: id,
                    visitor_id: local,
                    scene_key: active,
                    spawn_position: transform.map(|t| t.0),
                    spawn_rotation: transform.map(|t| t.1),
                });

                self.with_scene(active, |scene, renderer| {
                    scene.add_visitor(id, VisitorAttrs::default(), renderer);
                });
            }

            ServerMessage::UserDisconnect { id } => {
                if let Some(active) = self.active_scene {
                    self.with_scene(active, |scene, renderer| {
                        scene.remove_visitor(id, renderer);
                    });
                }
            }

            ServerMessage::SpawnPlayer {
                visitor_id,
                scene_key,
                spawn_position,
                spawn_rotation,
            } => {
                if Some(visitor_id) == self.local_identity {
                    return;
                }
                if !self.scenes.contains_key(&scene_key) {
                    tracing::debug!("Dropping spawn for unregistered scene {}", scene_key);
                    return;
                }
                self.with_scene(scene_key, |scene, renderer| {
                    scene.add_visitor(
                        visitor_id,
                        VisitorAttrs {
                            position: spawn_position,
                            rotation: spawn_rotation,
                            ..VisitorAttrs::default()
                        },
                        renderer,
                    );
                });
            }

            ServerMessage::JoinScene {
                user_id,
                scene_key,
                spawn_position,
                spawn_rotation,
            } => {
                // Our own hand-off already ran locally.
                if Some(user_id) == self.local_identity {
                    return;
                }

                let Some(renderer) = self.renderer.as_deref_mut() else {
                    return;
                };
                for scene in self.scenes.values_mut() {
                    if scene.key() != scene_key {
                        scene.remove_visitor(user_id, renderer);
                    }
                }
                if let Some(scene) = self.scenes.get_mut(&scene_key) {
                    scene.add_visitor(
                        user_id,
                        VisitorAttrs {
                            position: Some(spawn_position),
                            rotation: Some(spawn_rotation),
                            ..VisitorAttrs::default()
                        },
                        renderer,
                    );
                }
            }

            ServerMessage::UpdatePlayer {
                visitor_id,
                scene_key,
                keys_pressed,
                spawn_position,
                spawn_rotation,
                ..
            } => {
                // Snapshots for anything but the active scene are stale by
                // definition and dropped.
                if Some(scene_key) != self.active_scene {
                    return;
                }
                self.with_scene(scene_key, |scene, renderer| {
                    scene.apply_update(
                        visitor_id,
                        spawn_position,
                        spawn_rotation,
                        keys_pressed,
                        renderer,
                    );
                });
            }
        }
    }

    /// Per-frame update, driven by the external render loop: advance any
    /// in-flight hand-off, then the active scene (which emits exactly one
    /// outbound snapshot while the local avatar is present).
    pub fn tick(&mut self, delta: f32) {
        let hand_off = {
            let Some(renderer) = self.renderer.as_deref_mut() else {
                return;
            };
            self.transition.advance(delta, renderer)
        };

        if let Some(hand_off) = hand_off {
            // Completion order matters: leave the old scene, move the
            // pointer, then enter the new scene.
            self.with_scene(hand_off.from, |scene, renderer| {
                scene.remove_local(renderer);
            });
            self.enter_scene(hand_off.to);
        }

        let Some(active) = self.active_scene else {
            return;
        };
        let snapshot = match self.renderer.as_deref_mut() {
            Some(renderer) => self
                .scenes
                .get_mut(&active)
                .and_then(|scene| scene.update(delta, renderer)),
            None => None,
        };

        if let Some(snapshot) = snapshot {
            self.outbound.send(ClientMessage::UpdatePlayer {
                visitor_id: snapshot.id,
                scene_key: snapshot.scene_key,
                delta: snapshot.delta,
                keys_pressed: snapshot.input,
                spawn_position: Some(snapshot.position),
                spawn_rotation: Some(snapshot.rotation),
            });
        }
    }

    /// Press or release a control key on the local avatar.
    pub fn set_control(&mut self, key: &str, pressed: bool) {
        let Some(active) = self.active_scene else {
            return;
        };
        if let Some(local) = self
            .scenes
            .get_mut(&active)
            .and_then(|scene| scene.local_player_mut())
        {
            if pressed {
                local.input.press(key);
            } else {
                local.input.release(key);
            }
        }
    }

    /// Tear down: cancel any in-flight hand-off so the transitioning flag
    /// cannot stick.
    pub fn shutdown(&mut self) {
        if let Some(renderer) = self.renderer.as_deref_mut() {
            self.transition.cancel(renderer);
        }
    }

    /// Point the session at `key` and put the local avatar there. Skipped
    /// until the relay has assigned an identity; `Init` re-runs it.
    fn enter_scene(&mut self, key: SceneKey) {
        self.active_scene = Some(key);

        let Some(local) = self.local_identity else {
            tracing::debug!("Entering {} deferred until an identity is assigned", key);
            return;
        };
        let Some(renderer) = self.renderer.as_deref_mut() else {
            return;
        };
        let Some(scene) = self.scenes.get_mut(&key) else {
            return;
        };
        if scene.local_player().is_some() {
            return;
        }

        scene.add_local(local, &self.profile, renderer);
        self.outbound.send(ClientMessage::JoinScene {
            user_id: local,
            scene_key: key,
            spawn_position: scene.spawn_position(),
            spawn_rotation: scene.spawn_rotation(),
        });
    }

    /// Run a mutation against one registered scene with the renderer in
    /// hand; absorbs the not-initialized and not-registered cases.
    fn with_scene<F>(&mut self, key: SceneKey, f: F)
    where
        F: FnOnce(&mut SceneMembership, &mut dyn AvatarRenderer),
    {
        let Some(renderer) = self.renderer.as_deref_mut() else {
            return;
        };
        if let Some(scene) = self.scenes.get_mut(&key) {
            f(scene, renderer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::test_support::{RecordingOutbound, RecordingRenderer};
    use crate::domain::value_objects::{InputSnapshot, Position, Rotation};

    fn ready_session() -> (Session, Arc<RecordingOutbound>, ConnectionId) {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut session = Session::new(outbound.clone(), PlayerProfile::new("ada", 1));
        session
            .initialize(Box::new(RecordingRenderer::new()))
            .unwrap();
        for key in SceneKey::all() {
            session.register_scene(SceneConfig::new(key));
        }

        let id = ConnectionId::new();
        session.handle_event(ServerMessage::Init {
            id,
            users: vec![],
        });
        (session, outbound, id)
    }

    fn join_messages(messages: &[ClientMessage]) -> Vec<SceneKey> {
        messages
            .iter()
            .filter_map(|m| match m {
                ClientMessage::JoinScene { scene_key, .. } => Some(*scene_key),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_double_initialize_is_fatal() {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut session = Session::new(outbound, PlayerProfile::new("ada", 1));

        session
            .initialize(Box::new(RecordingRenderer::new()))
            .unwrap();
        let second = session.initialize(Box::new(RecordingRenderer::new()));

        assert!(matches!(second, Err(SessionError::AlreadyInitialized)));
    }

    #[test]
    fn test_register_scene_before_initialize_is_noop() {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut session = Session::new(outbound, PlayerProfile::new("ada", 1));

        session.register_scene(SceneConfig::new(SceneKey::MeetingRoom));

        assert!(session.scene(SceneKey::MeetingRoom).is_none());
    }

    #[test]
    fn test_set_active_scene_unregistered_key_leaves_pointer() {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut session = Session::new(outbound, PlayerProfile::new("ada", 1));
        session
            .initialize(Box::new(RecordingRenderer::new()))
            .unwrap();
        session.register_scene(SceneConfig::new(SceneKey::MeetingRoom));
        session.set_active_scene(SceneKey::MeetingRoom);

        session.set_active_scene(SceneKey::ChatRoom);

        assert_eq!(session.active_scene(), Some(SceneKey::MeetingRoom));
    }

    #[test]
    fn test_first_activation_spawns_local_and_announces() {
        let (mut session, outbound, id) = ready_session();

        session.set_active_scene(SceneKey::MeetingRoom);

        let scene = session.scene(SceneKey::MeetingRoom).unwrap();
        let local = scene.local_player().unwrap();
        assert_eq!(local.id, id);
        assert_eq!(join_messages(&outbound.drain()), vec![SceneKey::MeetingRoom]);
    }

    #[test]
    fn test_set_same_scene_is_noop() {
        let (mut session, outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        outbound.drain();

        session.set_active_scene(SceneKey::MeetingRoom);

        assert_eq!(outbound.sent(), 0);
        assert_eq!(
            session.scene(SceneKey::MeetingRoom).unwrap().player_count(),
            1
        );
    }

    #[test]
    fn test_activation_before_identity_is_deferred_until_init() {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut session = Session::new(outbound.clone(), PlayerProfile::new("ada", 1));
        session
            .initialize(Box::new(RecordingRenderer::new()))
            .unwrap();
        session.register_scene(SceneConfig::new(SceneKey::MeetingRoom));

        session.set_active_scene(SceneKey::MeetingRoom);
        assert_eq!(session.active_scene(), Some(SceneKey::MeetingRoom));
        assert!(session
            .scene(SceneKey::MeetingRoom)
            .unwrap()
            .local_player()
            .is_none());

        session.handle_event(ServerMessage::Init {
            id: ConnectionId::new(),
            users: vec![],
        });

        assert!(session
            .scene(SceneKey::MeetingRoom)
            .unwrap()
            .local_player()
            .is_some());
        assert_eq!(join_messages(&outbound.drain()), vec![SceneKey::MeetingRoom]);
    }

    #[test]
    fn test_switch_with_live_avatar_goes_through_transition() {
        let (mut session, outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        outbound.drain();

        session.set_active_scene(SceneKey::ChatRoom);

        // Pointer holds until the hand-off animation finishes.
        assert!(session.is_transitioning());
        assert_eq!(session.active_scene(), Some(SceneKey::MeetingRoom));

        session.tick(0.5);
        assert!(session.is_transitioning());

        session.tick(0.6);
        assert!(!session.is_transitioning());
        assert_eq!(session.active_scene(), Some(SceneKey::ChatRoom));
        assert!(session
            .scene(SceneKey::MeetingRoom)
            .unwrap()
            .local_player()
            .is_none());
        assert!(session
            .scene(SceneKey::ChatRoom)
            .unwrap()
            .local_player()
            .is_some());
        assert_eq!(join_messages(&outbound.drain()), vec![SceneKey::ChatRoom]);
    }

    #[test]
    fn test_second_switch_mid_transition_supersedes_first() {
        let (mut session, outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        outbound.drain();

        session.set_active_scene(SceneKey::ChatRoom);
        session.tick(0.5);

        // Change of heart mid-flight; the first animation is killed, not
        // run to completion.
        session.set_active_scene(SceneKey::ChatRoom);
        session.tick(0.5);
        assert!(session.is_transitioning());

        session.tick(0.6);
        assert!(!session.is_transitioning());
        assert_eq!(session.active_scene(), Some(SceneKey::ChatRoom));
        assert_eq!(join_messages(&outbound.drain()), vec![SceneKey::ChatRoom]);
    }

    #[test]
    fn test_user_connect_sends_spawn_request_and_adds_visitor() {
        let (mut session, outbound, id) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        outbound.drain();

        let peer = ConnectionId::new();
        session.handle_event(ServerMessage::UserConnect { id: peer });

        let messages = outbound.drain();
        match &messages[..] {
            [ClientMessage::SpawnPlayer {
                target_id,
                visitor_id,
                scene_key,
                ..
            }] => {
                assert_eq!(*target_id, peer);
                assert_eq!(*visitor_id, id);
                assert_eq!(*scene_key, SceneKey::MeetingRoom);
            }
            other => panic!("expected one spawn request, got {:?}", other),
        }
        assert!(session.scene(SceneKey::MeetingRoom).unwrap().contains(peer));
    }

    #[test]
    fn test_user_connect_before_active_scene_sends_nothing() {
        let (mut session, outbound, _) = ready_session();

        session.handle_event(ServerMessage::UserConnect {
            id: ConnectionId::new(),
        });

        assert_eq!(outbound.sent(), 0);
    }

    #[test]
    fn test_user_disconnect_removes_visitor_and_blocks_later_updates() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        let peer = ConnectionId::new();
        session.handle_event(ServerMessage::UserConnect { id: peer });
        assert!(session.scene(SceneKey::MeetingRoom).unwrap().contains(peer));

        session.handle_event(ServerMessage::UserDisconnect { id: peer });
        assert!(!session.scene(SceneKey::MeetingRoom).unwrap().contains(peer));

        // A straggler update for the departed peer is not applied.
        session.handle_event(ServerMessage::UpdatePlayer {
            visitor_id: peer,
            scene_key: SceneKey::MeetingRoom,
            delta: 0.016,
            keys_pressed: InputSnapshot::empty(),
            spawn_position: Some(Position::new(5.0, 0.0, 5.0)),
            spawn_rotation: Some(Rotation::identity()),
        });
        assert!(!session.scene(SceneKey::MeetingRoom).unwrap().contains(peer));
    }

    #[test]
    fn test_spawn_player_is_idempotent_and_ignores_self() {
        let (mut session, _outbound, id) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);

        let peer = ConnectionId::new();
        for _ in 0..2 {
            session.handle_event(ServerMessage::SpawnPlayer {
                visitor_id: peer,
                scene_key: SceneKey::ChatRoom,
                spawn_position: None,
                spawn_rotation: None,
            });
        }
        assert_eq!(session.scene(SceneKey::ChatRoom).unwrap().player_count(), 1);

        session.handle_event(ServerMessage::SpawnPlayer {
            visitor_id: id,
            scene_key: SceneKey::ChatRoom,
            spawn_position: None,
            spawn_rotation: None,
        });
        assert_eq!(session.scene(SceneKey::ChatRoom).unwrap().player_count(), 1);
    }

    #[test]
    fn test_join_scene_moves_visitor_between_scenes() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        let peer = ConnectionId::new();
        session.handle_event(ServerMessage::UserConnect { id: peer });

        session.handle_event(ServerMessage::JoinScene {
            user_id: peer,
            scene_key: SceneKey::ChatRoom,
            spawn_position: Position::zero(),
            spawn_rotation: Rotation::identity(),
        });

        assert!(!session.scene(SceneKey::MeetingRoom).unwrap().contains(peer));
        assert!(session.scene(SceneKey::ChatRoom).unwrap().contains(peer));
    }

    #[test]
    fn test_update_for_inactive_scene_is_dropped() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        let peer = ConnectionId::new();
        session.handle_event(ServerMessage::SpawnPlayer {
            visitor_id: peer,
            scene_key: SceneKey::ChatRoom,
            spawn_position: None,
            spawn_rotation: None,
        });

        session.handle_event(ServerMessage::UpdatePlayer {
            visitor_id: peer,
            scene_key: SceneKey::ChatRoom,
            delta: 0.016,
            keys_pressed: InputSnapshot::empty(),
            spawn_position: Some(Position::new(3.0, 0.0, 3.0)),
            spawn_rotation: Some(Rotation::identity()),
        });

        let record = session.scene(SceneKey::ChatRoom).unwrap().player(peer).unwrap();
        assert_eq!(record.position, Position::zero());
    }

    #[test]
    fn test_update_for_visitor_in_active_scene_applies_last_write() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        let peer = ConnectionId::new();
        session.handle_event(ServerMessage::UserConnect { id: peer });

        for x in [1.0_f32, 2.0] {
            session.handle_event(ServerMessage::UpdatePlayer {
                visitor_id: peer,
                scene_key: SceneKey::MeetingRoom,
                delta: 0.016,
                keys_pressed: InputSnapshot::empty(),
                spawn_position: Some(Position::new(x, 0.0, 0.0)),
                spawn_rotation: Some(Rotation::identity()),
            });
        }

        let record = session
            .scene(SceneKey::MeetingRoom)
            .unwrap()
            .player(peer)
            .unwrap();
        assert_eq!(record.position, Position::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_tick_emits_one_snapshot_per_call() {
        let (mut session, outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        outbound.drain();

        session.tick(0.016);
        session.tick(0.016);

        let updates = outbound
            .drain()
            .into_iter()
            .filter(|m| matches!(m, ClientMessage::UpdatePlayer { .. }))
            .count();
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_tick_without_local_avatar_emits_nothing() {
        let (mut session, outbound, _) = ready_session();

        session.tick(0.016);

        assert_eq!(outbound.sent(), 0);
    }

    #[test]
    fn test_shutdown_mid_transition_clears_flag() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);
        session.set_active_scene(SceneKey::ChatRoom);
        assert!(session.is_transitioning());

        session.shutdown();

        assert!(!session.is_transitioning());
    }

    #[test]
    fn test_controls_steer_local_avatar() {
        let (mut session, _outbound, _) = ready_session();
        session.set_active_scene(SceneKey::MeetingRoom);

        session.set_control("w", true);
        session.tick(0.5);

        let scene = session.scene(SceneKey::MeetingRoom).unwrap();
        assert!(scene.local_player().unwrap().position.z < 0.0);
    }
}
