//! Per-scene membership state
//!
//! Each registered scene owns an independent table of player records plus its
//! scripted NPCs. All mutations are idempotent or absorb missing entries,
//! since relay messages arrive unordered and may duplicate work already done
//! locally.

use std::collections::HashMap;

use crate::application::ports::AvatarRenderer;
use crate::domain::entities::npc::{NpcRecord, NpcSpec};
use crate::domain::entities::player::{PlayerProfile, PlayerRecord};
use crate::domain::value_objects::{ConnectionId, InputSnapshot, Position, Rotation, SceneKey};

/// Static description a scene is registered from.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub key: SceneKey,
    /// Default spawn point for records created without an explicit transform.
    pub spawn_position: Position,
    pub spawn_rotation: Rotation,
    pub npcs: Vec<NpcSpec>,
}

impl SceneConfig {
    pub fn new(key: SceneKey) -> Self {
        Self {
            key,
            spawn_position: Position::zero(),
            spawn_rotation: Rotation::identity(),
            npcs: Vec::new(),
        }
    }

    pub fn with_spawn(mut self, position: Position, rotation: Rotation) -> Self {
        self.spawn_position = position;
        self.spawn_rotation = rotation;
        self
    }

    pub fn with_npc(mut self, npc: NpcSpec) -> Self {
        self.npcs.push(npc);
        self
    }
}

/// Display attributes for a visitor record; anything unset falls back to the
/// scene defaults.
#[derive(Debug, Clone, Default)]
pub struct VisitorAttrs {
    pub username: Option<String>,
    pub model_id: Option<u32>,
    pub position: Option<Position>,
    pub rotation: Option<Rotation>,
}

/// Outbound state snapshot produced once per update tick while the local
/// participant is present.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: ConnectionId,
    pub scene_key: SceneKey,
    pub delta: f32,
    pub position: Position,
    pub rotation: Rotation,
    pub input: InputSnapshot,
}

/// Membership table for one registered scene.
#[derive(Debug)]
pub struct SceneMembership {
    key: SceneKey,
    spawn_position: Position,
    spawn_rotation: Rotation,
    players: HashMap<ConnectionId, PlayerRecord>,
    npcs: Vec<NpcRecord>,
}

impl SceneMembership {
    /// Build the membership state and spawn NPC avatars from static config.
    pub fn new(config: SceneConfig, renderer: &mut dyn AvatarRenderer) -> Self {
        let npcs = config
            .npcs
            .iter()
            .map(|spec| {
                let avatar = renderer.spawn_avatar(
                    config.key,
                    &spec.username,
                    spec.model_id,
                    spec.spawn_position,
                    spec.spawn_rotation,
                );
                NpcRecord::from_spec(spec, avatar)
            })
            .collect();

        Self {
            key: config.key,
            spawn_position: config.spawn_position,
            spawn_rotation: config.spawn_rotation,
            players: HashMap::new(),
            npcs,
        }
    }

    pub fn key(&self) -> SceneKey {
        self.key
    }

    pub fn spawn_position(&self) -> Position {
        self.spawn_position
    }

    pub fn spawn_rotation(&self) -> Rotation {
        self.spawn_rotation
    }

    pub fn player(&self, id: ConnectionId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn npcs(&self) -> &[NpcRecord] {
        &self.npcs
    }

    /// The authoritative local record, if the local participant is here.
    pub fn local_player(&self) -> Option<&PlayerRecord> {
        self.players.values().find(|p| p.is_local)
    }

    pub fn local_player_mut(&mut self) -> Option<&mut PlayerRecord> {
        self.players.values_mut().find(|p| p.is_local)
    }

    /// Add a non-local participant. Idempotent: a record already keyed by
    /// `id` (local or visitor) is left untouched.
    pub fn add_visitor(
        &mut self,
        id: ConnectionId,
        attrs: VisitorAttrs,
        renderer: &mut dyn AvatarRenderer,
    ) {
        if self.players.contains_key(&id) {
            tracing::debug!("Visitor {} already present in {}", id, self.key);
            return;
        }

        let profile = PlayerProfile::new(
            attrs.username.unwrap_or_else(|| format!("guest-{}", id)),
            attrs.model_id.unwrap_or(0),
        );
        let position = attrs.position.unwrap_or(self.spawn_position);
        let rotation = attrs.rotation.unwrap_or(self.spawn_rotation);
        let avatar =
            renderer.spawn_avatar(self.key, &profile.username, profile.model_id, position, rotation);

        self.players.insert(
            id,
            PlayerRecord::new(id, &profile, false, position, rotation, avatar),
        );
        tracing::info!("Visitor {} joined {}", id, self.key);
    }

    /// Remove a visitor and tear down its avatar. No-op when absent or when
    /// `id` names the local record (the local avatar leaves only through
    /// `remove_local`).
    pub fn remove_visitor(&mut self, id: ConnectionId, renderer: &mut dyn AvatarRenderer) {
        match self.players.get(&id) {
            Some(record) if record.is_local => {
                tracing::warn!("Refusing to remove local record {} as visitor", id);
                return;
            }
            Some(_) => {}
            None => return,
        }
        if let Some(record) = self.players.remove(&id) {
            renderer.despawn_avatar(record.avatar);
            tracing::info!("Visitor {} left {}", id, self.key);
        }
    }

    /// Add the local participant keyed by the session's own identity.
    /// Idempotent when a local record already exists.
    pub fn add_local(
        &mut self,
        id: ConnectionId,
        profile: &PlayerProfile,
        renderer: &mut dyn AvatarRenderer,
    ) {
        if self.local_player().is_some() {
            return;
        }

        let avatar = renderer.spawn_avatar(
            self.key,
            &profile.username,
            profile.model_id,
            self.spawn_position,
            self.spawn_rotation,
        );
        self.players.insert(
            id,
            PlayerRecord::new(
                id,
                profile,
                true,
                self.spawn_position,
                self.spawn_rotation,
                avatar,
            ),
        );
        tracing::info!("Local participant {} entered {}", id, self.key);
    }

    /// Remove the local participant, if present, and tear down its avatar.
    pub fn remove_local(&mut self, renderer: &mut dyn AvatarRenderer) {
        let Some(id) = self.local_player().map(|p| p.id) else {
            return;
        };
        if let Some(record) = self.players.remove(&id) {
            renderer.despawn_avatar(record.avatar);
            tracing::info!("Local participant {} left {}", id, self.key);
        }
    }

    /// Apply a received snapshot to an existing non-local record. A snapshot
    /// carrying no transform keeps the record where it is.
    ///
    /// Returns whether the update was applied; unknown ids and the local
    /// record are dropped silently (the local record is authoritative here).
    pub fn apply_update(
        &mut self,
        id: ConnectionId,
        position: Option<Position>,
        rotation: Option<Rotation>,
        input: InputSnapshot,
        renderer: &mut dyn AvatarRenderer,
    ) -> bool {
        let Some(record) = self.players.get_mut(&id) else {
            return false;
        };
        if record.is_local {
            return false;
        }

        let position = position.unwrap_or(record.position);
        let rotation = rotation.unwrap_or(record.rotation);
        record.apply_snapshot(position, rotation, input);
        renderer.move_avatar(record.avatar, record.position, record.rotation);
        true
    }

    /// Advance one frame: local simulation, NPC clocks, and exactly one
    /// outbound snapshot when the local participant is present.
    pub fn update(&mut self, delta: f32, renderer: &mut dyn AvatarRenderer) -> Option<PlayerSnapshot> {
        for npc in &mut self.npcs {
            npc.advance(delta);
        }

        let key = self.key;
        let local = self.local_player_mut()?;
        local.advance_local(delta);
        renderer.move_avatar(local.avatar, local.position, local.rotation);

        Some(PlayerSnapshot {
            id: local.id,
            scene_key: key,
            delta,
            position: local.position,
            rotation: local.rotation,
            input: local.input.clone(),
        })
    }
}
