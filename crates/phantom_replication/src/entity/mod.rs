//! # Replicated Entities
//!
//! A [`ReplicatedEntity`] is one phantom: a common identity/transform/viewer
//! core plus the capability blocks its [`EntityKind`] selects. Entities are
//! owned by the coordinator's slot map; application code reaches them through
//! [`crate::ReplicationCoordinator::entity`] and
//! [`crate::ReplicationCoordinator::entity_mut`] and pushes changes with
//! `update()`.
//!
//! ## Per-Viewer State
//!
//! The same entity can be spawned for one viewer and absent for another.
//! `viewers` is the set of clients that currently hold a spawned copy. It
//! only changes through the coordinator, which keeps it empty while the
//! entity is not spawned.
//!
//! A viewer whose send failed stays in `viewers` and is also marked for
//! resync: the next `update()` or reconciliation resends its whole spawn
//! sequence before any delta.

pub mod capability;
pub mod kind;
mod replicate;

pub use capability::{
    Ageable, ArmorStandPose, BatState, Capabilities, CreeperState, FallingBlock, Gear, Health,
    PlayerProfile, Tameable, VisualFlags,
};
pub use kind::EntityKind;

use crate::error::ReplicationError;
use crate::interaction::{InteractionObserver, NameProvider, ObserverId};
use crate::metadata::{self, MetadataMap, StateWatcher, ViewerOverrides};
use crate::protocol::MetadataValue;
use crate::types::{EntityId, Transform, ViewerId};
use crate::visibility::VisibilityScope;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Passenger ids; most mounts carry one or two riders.
pub type Passengers = SmallVec<[EntityId; 2]>;

/// One client-only entity and its replication state.
pub struct ReplicatedEntity {
    id: EntityId,
    uuid: Option<Uuid>,
    kind: EntityKind,
    type_name: String,
    transform: Transform,
    head_yaw: f32,
    visibility: VisibilityScope,
    spawned: bool,
    ever_spawned: bool,
    viewers: HashSet<ViewerId>,
    resync: HashSet<ViewerId>,
    observers: Vec<(ObserverId, Arc<dyn InteractionObserver>)>,
    next_observer: u64,
    name_provider: Option<Arc<dyn NameProvider>>,
    name_limit: usize,
    watcher: StateWatcher,
    passengers: Passengers,
    /// Visual flags shared by every kind
    pub flags: VisualFlags,
    capabilities: Capabilities,
}

impl std::fmt::Debug for ReplicatedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedEntity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("transform", &self.transform)
            .field("spawned", &self.spawned)
            .field("viewers", &self.viewers.len())
            .field("observers", &self.observers.len())
            .field("passengers", &self.passengers)
            .finish_non_exhaustive()
    }
}

impl ReplicatedEntity {
    pub(crate) fn new(
        id: EntityId,
        kind: EntityKind,
        type_name: String,
        transform: Transform,
        name_limit: usize,
    ) -> Self {
        let uuid = (kind == EntityKind::Player).then(Uuid::new_v4);
        let head_yaw = transform.yaw;
        Self {
            id,
            uuid,
            kind,
            type_name,
            transform,
            head_yaw,
            visibility: VisibilityScope::Global,
            spawned: false,
            ever_spawned: false,
            viewers: HashSet::new(),
            resync: HashSet::new(),
            observers: Vec::new(),
            next_observer: 1,
            name_provider: None,
            name_limit,
            watcher: StateWatcher::new(),
            passengers: Passengers::new(),
            flags: VisualFlags::default(),
            capabilities: kind.capabilities(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn head_yaw(&self) -> f32 {
        self.head_yaw
    }

    pub fn visibility(&self) -> &VisibilityScope {
        &self.visibility
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    /// Whether `viewer` currently holds a spawned copy.
    pub fn is_viewed_by(&self, viewer: ViewerId) -> bool {
        self.viewers.contains(&viewer)
    }

    pub fn viewers(&self) -> impl Iterator<Item = ViewerId> + '_ {
        self.viewers.iter().copied()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Whether `viewer` missed a packet and will be sent the full spawn
    /// sequence again.
    pub fn needs_resync(&self, viewer: ViewerId) -> bool {
        self.resync.contains(&viewer)
    }

    pub fn passengers(&self) -> &[EntityId] {
        &self.passengers
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn metadata(&self) -> &StateWatcher {
        &self.watcher
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Sets or clears the per-viewer display name.
    pub fn set_name_provider(&mut self, provider: Option<Arc<dyn NameProvider>>) {
        self.name_provider = provider;
    }

    pub fn has_name_provider(&self) -> bool {
        self.name_provider.is_some()
    }

    pub fn health_mut(&mut self) -> Result<&mut Health, ReplicationError> {
        let id = self.id;
        self.capabilities.health.as_mut().ok_or(missing(id, "health"))
    }

    pub fn ageable_mut(&mut self) -> Result<&mut Ageable, ReplicationError> {
        let id = self.id;
        self.capabilities.ageable.as_mut().ok_or(missing(id, "ageable"))
    }

    pub fn tameable_mut(&mut self) -> Result<&mut Tameable, ReplicationError> {
        let id = self.id;
        self.capabilities.tameable.as_mut().ok_or(missing(id, "tameable"))
    }

    pub fn gear_mut(&mut self) -> Result<&mut Gear, ReplicationError> {
        let id = self.id;
        self.capabilities.gear.as_mut().ok_or(missing(id, "gear"))
    }

    pub fn armor_stand_mut(&mut self) -> Result<&mut ArmorStandPose, ReplicationError> {
        let id = self.id;
        self.capabilities.armor_stand.as_mut().ok_or(missing(id, "armor stand"))
    }

    pub fn player(&self) -> Option<&PlayerProfile> {
        self.capabilities.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Result<&mut PlayerProfile, ReplicationError> {
        let id = self.id;
        self.capabilities.player.as_mut().ok_or(missing(id, "player profile"))
    }

    pub fn creeper_mut(&mut self) -> Result<&mut CreeperState, ReplicationError> {
        let id = self.id;
        self.capabilities.creeper.as_mut().ok_or(missing(id, "creeper"))
    }

    pub fn bat_mut(&mut self) -> Result<&mut BatState, ReplicationError> {
        let id = self.id;
        self.capabilities.bat.as_mut().ok_or(missing(id, "bat"))
    }

    pub fn falling_block_mut(&mut self) -> Result<&mut FallingBlock, ReplicationError> {
        let id = self.id;
        self.capabilities.falling_block.as_mut().ok_or(missing(id, "falling block"))
    }

    /// Derives every metadata field from the live state.
    ///
    /// Flag bytes are packed from scratch on each call.
    pub fn derive_metadata(&self) -> MetadataMap {
        use crate::metadata::*;

        let mut fields = MetadataMap::new();
        let flags = &self.flags;
        fields.insert(
            STATUS_FLAGS,
            MetadataValue::Byte(pack_bits(&[
                (status_bits::ON_FIRE, flags.on_fire),
                (status_bits::CROUCHED, flags.crouched),
                (status_bits::SPRINTING, flags.sprinting),
                (status_bits::INVISIBLE, flags.invisible),
            ])),
        );
        let name = flags.custom_name.as_deref().unwrap_or_default();
        fields.insert(CUSTOM_NAME, MetadataValue::Text(self.clamp_name(name)));
        fields.insert(CUSTOM_NAME_VISIBLE, MetadataValue::Bool(flags.name_visible));
        fields.insert(NO_GRAVITY, MetadataValue::Bool(flags.no_gravity));

        let caps = &self.capabilities;
        if let Some(health) = &caps.health {
            fields.insert(HEALTH, MetadataValue::Float(health.current));
        }

        if let Some(stand) = &caps.armor_stand {
            fields.insert(
                ARMOR_STAND_FLAGS,
                MetadataValue::Byte(pack_bits(&[
                    (armor_stand_bits::SMALL, stand.small),
                    (armor_stand_bits::HAS_ARMS, stand.arms),
                    (armor_stand_bits::NO_BASEPLATE, stand.no_baseplate),
                    (armor_stand_bits::MARKER, stand.marker),
                ])),
            );
            let poses = [
                (ARMOR_STAND_HEAD_POSE, stand.head),
                (ARMOR_STAND_BODY_POSE, stand.body),
                (ARMOR_STAND_LEFT_ARM_POSE, stand.left_arm),
                (ARMOR_STAND_RIGHT_ARM_POSE, stand.right_arm),
                (ARMOR_STAND_LEFT_LEG_POSE, stand.left_leg),
                (ARMOR_STAND_RIGHT_LEG_POSE, stand.right_leg),
            ];
            for (index, pose) in poses {
                fields.insert(index, MetadataValue::Rotation(pose.to_degrees()));
            }
        }

        if let Some(ageable) = &caps.ageable {
            fields.insert(AGEABLE_BABY, MetadataValue::Bool(ageable.baby));
        }

        if let Some(profile) = &caps.player {
            fields.insert(PLAYER_SKIN_LAYERS, MetadataValue::Byte(profile.skin_layers));
        }

        if let Some(creeper) = &caps.creeper {
            fields.insert(CREEPER_CHARGED, MetadataValue::Bool(creeper.charged));
            fields.insert(CREEPER_IGNITED, MetadataValue::Bool(creeper.ignited));
        }

        if let Some(bat) = &caps.bat {
            fields.insert(BAT_AWAKE, MetadataValue::Bool(bat.awake));
        }

        if let Some(tameable) = &caps.tameable {
            fields.insert(
                TAMEABLE_FLAGS,
                MetadataValue::Byte(pack_bits(&[
                    (tameable_bits::SITTING, tameable.sitting),
                    (tameable_bits::TAMED, tameable.tamed),
                ])),
            );
            let owner = tameable.owner.clone().unwrap_or_default();
            fields.insert(TAMEABLE_OWNER, MetadataValue::Text(owner));
        }

        fields
    }

    /// Re-derives the watcher's current snapshot.
    pub fn refresh_metadata(&mut self) {
        let fields = self.derive_metadata();
        self.watcher.refresh(fields);
    }

    fn clamp_name(&self, name: &str) -> String {
        name.chars().take(self.name_limit).collect()
    }

    /// Per-viewer values layered over the shared snapshot.
    fn overrides_for(&self, viewer: ViewerId) -> ViewerOverrides {
        let mut overrides = ViewerOverrides::new();
        if let Some(provider) = &self.name_provider {
            let name = self.clamp_name(&provider.name_for(viewer));
            overrides.set(metadata::CUSTOM_NAME, MetadataValue::Text(name));
        }
        overrides
    }

    pub(crate) fn add_observer(&mut self, observer: Arc<dyn InteractionObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Snapshot of the observers, so callbacks run without borrowing the list.
    pub(crate) fn observers(&self) -> Vec<Arc<dyn InteractionObserver>> {
        self.observers.iter().map(|(_, observer)| observer.clone()).collect()
    }

    pub(crate) fn visibility_mut(&mut self) -> &mut VisibilityScope {
        &mut self.visibility
    }

    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.head_yaw = transform.yaw;
        self.transform = transform;
    }

    pub(crate) fn set_head_yaw(&mut self, yaw: f32) {
        self.head_yaw = yaw;
    }

    pub(crate) fn passengers_mut(&mut self) -> &mut Passengers {
        &mut self.passengers
    }

    pub(crate) fn has_ever_spawned(&self) -> bool {
        self.ever_spawned
    }

    pub(crate) fn mark_spawned(&mut self) {
        self.spawned = true;
        self.ever_spawned = true;
    }

    pub(crate) fn mark_despawned(&mut self) {
        self.spawned = false;
    }

    /// Drops `viewer` without sending anything.
    pub(crate) fn forget_viewer(&mut self, viewer: ViewerId) -> bool {
        self.resync.remove(&viewer);
        self.viewers.remove(&viewer)
    }
}

fn missing(id: EntityId, capability: &'static str) -> ReplicationError {
    ReplicationError::CapabilityMissing { id, capability }
}
