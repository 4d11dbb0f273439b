//! # Replication Coordinator
//!
//! The coordinator owns every phantom entity and keeps each viewer's view of
//! them consistent. It is driven from the host's tick loop:
//!
//! - **Entity operations** (`create`, `spawn`, `update`, `move_to`, ...)
//!   mutate one entity and send the resulting packets to its viewers.
//! - **Viewer events** (`on_viewer_moved`, `on_viewer_joined`, ...)
//!   reconcile every entity against one viewer, spawning or despawning as
//!   eligibility changes.
//! - **`tick()`** advances the internal scheduler, which runs the periodic
//!   tab-list sweep.
//!
//! All methods take `&mut self` and run to completion, so events for one
//! viewer are processed strictly in the order the host reports them.
//!
//! ## Failure Handling
//!
//! A failed send is logged and counted, never propagated. The viewer keeps
//! its place in the entity's viewer set and is marked for resync; the next
//! `update()` or reconciliation touching that viewer resends the whole spawn
//! sequence. A failing or panicking interaction observer is isolated from
//! the other observers.

use crate::config::ReplicationConfig;
use crate::context::{ReplicationContext, ViewerState};
use crate::entity::{EntityKind, ReplicatedEntity};
use crate::error::{ConfigValidationError, ReplicationError};
use crate::identity::IdentityRegistry;
use crate::interaction::{InteractionAction, InteractionObserver, InteractionRouter, ObserverId};
use crate::protocol::{EntityStatus, NameTagVisibility, Packet, PlayerInfoAction, RawInteraction};
use crate::scheduler::{TaskHandle, TickScheduler};
use crate::stats::{Outbox, ReplicationStats};
use crate::types::{BlockPos, EntityHandle, EntityId, Transform, Velocity, ViewerId};
use crate::visibility::{VisibilityPolicy, VisibilityScope};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// How far below a sitting player its seat is placed.
const SEAT_DROP: f64 = 0.7;

/// Work the coordinator schedules on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorTask {
    /// Send the deferred tab-list removals
    TabListSweep,
}

/// A player-kind entity waiting to be removed from one viewer's tab list.
#[derive(Debug, Clone, PartialEq)]
struct TabEntry {
    entity: EntityId,
    uuid: Uuid,
    name: String,
}

/// Owns all phantom entities and drives their per-viewer replication.
#[derive(Debug)]
pub struct ReplicationCoordinator {
    ctx: ReplicationContext,
    config: ReplicationConfig,
    policy: VisibilityPolicy,
    identity: IdentityRegistry,
    entities: SlotMap<EntityHandle, ReplicatedEntity>,
    by_id: HashMap<EntityId, EntityHandle>,
    router: InteractionRouter,
    tab_list: HashMap<ViewerId, Vec<TabEntry>>,
    scheduler: TickScheduler<CoordinatorTask>,
    sweep_task: TaskHandle,
    stats: ReplicationStats,
}

impl ReplicationCoordinator {
    /// Creates a coordinator and schedules the periodic tab-list sweep.
    pub fn new(
        ctx: ReplicationContext,
        config: ReplicationConfig,
    ) -> Result<Self, ConfigValidationError> {
        config.validate()?;

        let mut scheduler = TickScheduler::new();
        let interval = config.sweep_interval_ticks;
        let sweep_task =
            scheduler.schedule_repeating(interval, interval, CoordinatorTask::TabListSweep);

        info!(
            "🔧 Replication coordinator ready (render distance {}, id floor {})",
            config.render_distance, config.entity_id_floor
        );

        Ok(Self {
            policy: VisibilityPolicy::new(config.render_distance),
            identity: IdentityRegistry::new(config.entity_id_floor),
            ctx,
            config,
            entities: SlotMap::with_key(),
            by_id: HashMap::new(),
            router: InteractionRouter::new(),
            tab_list: HashMap::new(),
            scheduler,
            sweep_task,
            stats: ReplicationStats::default(),
        })
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.ctx
    }

    pub fn stats(&self) -> &ReplicationStats {
        &self.stats
    }

    /// Ticks advanced so far.
    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }

    /// Number of live entities, spawned or not.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn handles(&self) -> Vec<EntityHandle> {
        self.entities.keys().collect()
    }

    /// Tab-list removals still queued for `viewer`.
    pub fn pending_tab_removals(&self, viewer: ViewerId) -> usize {
        self.tab_list.get(&viewer).map_or(0, Vec::len)
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Creates an entity and allocates its id. The entity is not spawned.
    pub fn create(
        &mut self,
        kind: EntityKind,
        type_name: impl Into<String>,
        transform: Transform,
    ) -> EntityHandle {
        let id = self.identity.next_id(self.ctx.worlds.as_ref());
        let entity = ReplicatedEntity::new(
            id,
            kind,
            type_name.into(),
            transform,
            self.config.max_custom_name_length,
        );
        let handle = self.entities.insert(entity);
        self.by_id.insert(id, handle);
        debug!("🆕 Created {} entity {} ({:?})", kind, id, handle);
        handle
    }

    /// Creates a player-kind entity with the given tab-list name.
    pub fn create_player(&mut self, name: impl Into<String>, transform: Transform) -> EntityHandle {
        let handle = self.create(EntityKind::Player, "player", transform);
        if let Some(profile) = self
            .entities
            .get_mut(handle)
            .and_then(|entity| entity.player_mut().ok())
        {
            profile.name = name.into();
        }
        handle
    }

    pub fn entity(&self, handle: EntityHandle) -> Result<&ReplicatedEntity, ReplicationError> {
        self.entities.get(handle).ok_or(ReplicationError::StaleHandle)
    }

    pub fn entity_mut(
        &mut self,
        handle: EntityHandle,
    ) -> Result<&mut ReplicatedEntity, ReplicationError> {
        self.entities.get_mut(handle).ok_or(ReplicationError::StaleHandle)
    }

    /// Looks up a live entity by network id.
    pub fn handle_of(&self, id: EntityId) -> Option<EntityHandle> {
        self.by_id.get(&id).copied()
    }

    /// Spawns the entity for every eligible online viewer and starts routing
    /// its interactions. Spawning an already spawned entity is a no-op.
    ///
    /// A player kind with a hidden name tag is first added to the hidden
    /// team of every online viewer.
    pub fn spawn(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        let id = entity.id();
        if entity.is_spawned() {
            debug!("Entity {} already spawned", id);
            return Ok(());
        }
        entity.mark_spawned();
        entity.refresh_metadata();
        entity.commit_snapshots();
        let hidden_name = entity
            .player()
            .filter(|profile| profile.hide_name_tag)
            .map(|profile| profile.name.clone());
        self.router.register(id, handle);

        if let Some(name) = hidden_name {
            self.announce_hidden_name(name);
        }
        self.reconcile_entity(handle);

        let entity = self.entity(handle)?;
        info!("✨ Spawned entity {} for {} viewer(s)", id, entity.viewer_count());
        Ok(())
    }

    /// Sends changed metadata and equipment to current viewers.
    pub fn update(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entities.get_mut(handle).ok_or(ReplicationError::StaleHandle)?;
        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        for viewer in entity.broadcast_update(&mut out) {
            queue_tab_removal(&mut self.tab_list, entity, viewer);
        }
        Ok(())
    }

    /// Moves the entity, then reconciles it against every online viewer.
    ///
    /// Short moves go out as relative moves, long ones as teleports, each
    /// followed by a head rotation.
    pub fn move_to(
        &mut self,
        handle: EntityHandle,
        transform: Transform,
    ) -> Result<(), ReplicationError> {
        let threshold = self.config.teleport_threshold_squared;
        let entity = self.entities.get_mut(handle).ok_or(ReplicationError::StaleHandle)?;
        if !entity.has_ever_spawned() {
            return Err(ReplicationError::NotSpawned(entity.id()));
        }

        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        let movement = entity.move_packet(&transform, threshold);
        entity.broadcast(movement, &mut out);
        entity.broadcast(
            Packet::HeadRotation {
                id: entity.id(),
                yaw: transform.yaw,
            },
            &mut out,
        );
        entity.set_transform(transform);

        if entity.is_spawned() {
            self.reconcile_entity(handle);
        }
        Ok(())
    }

    pub fn add_velocity(
        &mut self,
        handle: EntityHandle,
        velocity: Velocity,
    ) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| Ok(entity.velocity_packet(velocity)))
    }

    /// Plays a one-shot status animation for current viewers.
    pub fn play_status(
        &mut self,
        handle: EntityHandle,
        status: EntityStatus,
    ) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            Ok(Packet::Status {
                id: entity.id(),
                status: status.code(),
            })
        })
    }

    pub fn set_head_rotation(
        &mut self,
        handle: EntityHandle,
        yaw: f32,
    ) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            entity.set_head_yaw(yaw);
            Ok(Packet::HeadRotation { id: entity.id(), yaw })
        })
    }

    /// Replaces the passenger list. An empty list dismounts everyone.
    pub fn set_passengers(
        &mut self,
        handle: EntityHandle,
        passengers: impl IntoIterator<Item = EntityId>,
    ) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            *entity.passengers_mut() = passengers.into_iter().collect();
            Ok(entity.mount_packet())
        })
    }

    pub fn add_passenger(
        &mut self,
        handle: EntityHandle,
        passenger: EntityId,
    ) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            if !entity.passengers().contains(&passenger) {
                entity.passengers_mut().push(passenger);
            }
            Ok(entity.mount_packet())
        })
    }

    /// Removes one passenger; returns whether it was riding.
    pub fn remove_passenger(
        &mut self,
        handle: EntityHandle,
        passenger: EntityId,
    ) -> Result<bool, ReplicationError> {
        let entity = self.entity_mut(handle)?;
        let before = entity.passengers().len();
        entity.passengers_mut().retain(|id| *id != passenger);
        if entity.passengers().len() == before {
            return Ok(false);
        }
        self.broadcast_with(handle, |entity| Ok(entity.mount_packet()))?;
        Ok(true)
    }

    /// Puts a player-kind entity into the bed at `bed`.
    pub fn sleep(&mut self, handle: EntityHandle, bed: BlockPos) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            let id = entity.id();
            entity.player_mut()?.sleeping = Some(bed);
            Ok(Packet::Bed {
                id,
                position: Some(bed),
            })
        })
    }

    pub fn wake(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        self.broadcast_with(handle, |entity| {
            let id = entity.id();
            entity.player_mut()?.sleeping = None;
            Ok(Packet::Bed { id, position: None })
        })
    }

    /// Makes the entity sit.
    ///
    /// Tameable kinds set their sitting flag. Player kinds ride an invisible
    /// marker armor stand spawned under them.
    pub fn sit(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        match entity.kind() {
            EntityKind::Tameable => {
                entity.tameable_mut()?.sitting = true;
                self.update(handle)
            }
            EntityKind::Player => self.seat(handle),
            _ => Err(ReplicationError::CapabilityMissing {
                id: entity.id(),
                capability: "seat",
            }),
        }
    }

    pub fn stand(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        match entity.kind() {
            EntityKind::Tameable => {
                entity.tameable_mut()?.sitting = false;
                self.update(handle)
            }
            EntityKind::Player => {
                let seat = entity.player_mut()?.seat.take();
                if let Some(seat) = seat {
                    if self.entities.contains_key(seat) {
                        self.remove(seat)?;
                    }
                }
                Ok(())
            }
            _ => Err(ReplicationError::CapabilityMissing {
                id: entity.id(),
                capability: "seat",
            }),
        }
    }

    fn seat(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity(handle)?;
        let id = entity.id();
        if !entity.is_spawned() {
            return Err(ReplicationError::NotSpawned(id));
        }
        if let Some(seat) = entity.player().and_then(|profile| profile.seat) {
            // A seat despawned on its own is spawned again in place.
            if let Some(spawned) = self.entities.get(seat).map(ReplicatedEntity::is_spawned) {
                if spawned {
                    return Ok(());
                }
                return self.spawn(seat);
            }
        }

        let scope = entity.visibility().clone();
        let mut seat_transform = entity.transform().clone();
        seat_transform.position = seat_transform.position.offset(0.0, -SEAT_DROP, 0.0);

        let seat = self.create(EntityKind::ArmorStand, "armor_stand", seat_transform);
        {
            let stand = self.entity_mut(seat)?;
            stand.flags.invisible = true;
            stand.flags.no_gravity = true;
            stand.armor_stand_mut()?.marker = true;
            *stand.visibility_mut() = scope;
            stand.passengers_mut().push(id);
        }
        self.entity_mut(handle)?.player_mut()?.seat = Some(seat);
        self.spawn(seat)
    }

    /// Allows `viewer` to see the entity, spawning it for them right away
    /// when they are online and in range.
    pub fn add_visible_to(
        &mut self,
        handle: EntityHandle,
        viewer: ViewerId,
    ) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        entity.visibility_mut().insert(viewer);
        if !entity.is_spawned() {
            return Ok(());
        }
        if let Some(state) = self.ctx.viewers.viewer(viewer) {
            self.reconcile_pair(handle, &state);
        }
        Ok(())
    }

    /// Revokes `viewer`'s visibility and despawns the entity for them
    /// immediately.
    pub fn remove_visible_to(
        &mut self,
        handle: EntityHandle,
        viewer: ViewerId,
    ) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        entity.visibility_mut().remove(viewer);
        if entity.is_spawned() {
            self.hide(handle, viewer);
        }
        Ok(())
    }

    /// Drops the allow-list and reconciles against every online viewer.
    pub fn make_global(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        *entity.visibility_mut() = VisibilityScope::Global;
        if entity.is_spawned() {
            self.reconcile_entity(handle);
        }
        Ok(())
    }

    pub fn add_observer(
        &mut self,
        handle: EntityHandle,
        observer: impl InteractionObserver + 'static,
    ) -> Result<ObserverId, ReplicationError> {
        Ok(self.entity_mut(handle)?.add_observer(Arc::new(observer)))
    }

    pub fn remove_observer(
        &mut self,
        handle: EntityHandle,
        observer: ObserverId,
    ) -> Result<bool, ReplicationError> {
        Ok(self.entity_mut(handle)?.remove_observer(observer))
    }

    /// Destroys the entity for all viewers and stops routing its
    /// interactions. Despawning twice is a no-op.
    ///
    /// A sitting player's seat is removed along with it.
    pub fn despawn(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        let entity = self.entity_mut(handle)?;
        if !entity.is_spawned() {
            return Ok(());
        }
        entity.mark_despawned();
        let id = entity.id();
        let viewers: Vec<ViewerId> = entity.viewers().collect();
        let seat = entity.player_mut().ok().and_then(|profile| profile.seat.take());

        self.router.unregister(id);
        for viewer in &viewers {
            self.hide(handle, *viewer);
        }

        if let Some(seat) = seat {
            if self.entities.contains_key(seat) {
                self.remove(seat)?;
            }
        }

        info!("🗑️ Despawned entity {} for {} viewer(s)", id, viewers.len());
        Ok(())
    }

    /// Despawns if needed, frees the slot and releases the id.
    pub fn remove(&mut self, handle: EntityHandle) -> Result<(), ReplicationError> {
        self.despawn(handle)?;
        let entity = self.entities.remove(handle).ok_or(ReplicationError::StaleHandle)?;
        self.identity.release(entity.id());
        self.by_id.remove(&entity.id());
        debug!("Removed entity {} ({:?})", entity.id(), handle);
        Ok(())
    }

    /// Despawns every entity and stops the periodic sweep.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel(self.sweep_task);
        for handle in self.handles() {
            // Seats go away with their riders.
            if !self.entities.contains_key(handle) {
                continue;
            }
            if let Err(e) = self.despawn(handle) {
                warn!("⚠️ Failed to despawn {:?} during shutdown: {}", handle, e);
            }
        }
        info!("🛑 Replication coordinator shut down ({} entities)", self.entities.len());
    }

    // ------------------------------------------------------------------
    // Viewer events
    // ------------------------------------------------------------------

    pub fn on_viewer_moved(&mut self, viewer: ViewerId) {
        self.reconcile_viewer(viewer);
    }

    pub fn on_viewer_teleported(&mut self, viewer: ViewerId) {
        self.reconcile_viewer(viewer);
    }

    pub fn on_viewer_respawned(&mut self, viewer: ViewerId) {
        self.reconcile_viewer(viewer);
    }

    /// Registers the hidden-name-tag team with the viewer, then reconciles.
    pub fn on_viewer_joined(&mut self, viewer: ViewerId) {
        let members: Vec<String> = self
            .entities
            .iter()
            .filter_map(|(_, entity)| entity.player())
            .filter(|profile| profile.hide_name_tag)
            .map(|profile| profile.name.clone())
            .collect();

        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        out.send(
            viewer,
            Packet::TeamRegistration {
                team: self.config.hidden_name_team.clone(),
                name_tag_visibility: NameTagVisibility::Never,
                members,
            },
        );

        info!("👋 Viewer {} joined", viewer);
        self.reconcile_viewer(viewer);
    }

    /// Forgets the viewer everywhere without sending anything.
    pub fn on_viewer_quit(&mut self, viewer: ViewerId) {
        let mut forgotten = 0;
        for entity in self.entities.values_mut() {
            if entity.forget_viewer(viewer) {
                forgotten += 1;
            }
        }
        self.tab_list.remove(&viewer);
        info!("👋 Viewer {} quit, dropped from {} entities", viewer, forgotten);
    }

    /// Despawns entities bound to the old world and spawns those now
    /// eligible. Entities the viewer keeps seeing are left untouched.
    pub fn on_viewer_changed_world(&mut self, viewer: ViewerId) {
        let Some(state) = self.ctx.viewers.viewer(viewer) else {
            debug!("Viewer {} changed world but is offline", viewer);
            return;
        };

        for handle in self.handles() {
            let Some(entity) = self.entities.get(handle) else {
                continue;
            };
            if !entity.is_spawned() {
                continue;
            }
            if entity.is_viewed_by(viewer) {
                if !self.policy.same_world(entity.transform(), &state) {
                    self.hide(handle, viewer);
                }
            } else if self.policy.eligible(entity.visibility(), entity.transform(), &state) {
                self.show(handle, viewer);
            }
        }
    }

    /// Routes an inbound interaction to the target's observers.
    ///
    /// Returns `true` when the target is a spawned phantom, whether or not
    /// the raw type maps to an action; the host must then drop the message.
    pub fn on_interaction_received(
        &mut self,
        viewer: ViewerId,
        target: EntityId,
        raw: RawInteraction,
    ) -> bool {
        let Some(handle) = self.router.resolve(target) else {
            return false;
        };
        self.stats.interactions_routed += 1;

        let Some(action) = InteractionAction::from_raw(raw) else {
            trace!("Ignoring {:?} on entity {} from {}", raw, target, viewer);
            return true;
        };
        let Some(entity) = self.entities.get(handle) else {
            return true;
        };

        for observer in entity.observers() {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                observer.on_interaction(viewer, entity, action)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.stats.observer_failures += 1;
                    warn!("⚠️ Interaction observer on entity {} failed: {}", target, e);
                }
                Err(_) => {
                    self.stats.observer_failures += 1;
                    error!("❌ Interaction observer on entity {} panicked", target);
                }
            }
        }
        true
    }

    /// Advances one tick and runs due coordinator tasks.
    pub fn tick(&mut self) {
        for (_, task) in self.scheduler.advance() {
            match task {
                CoordinatorTask::TabListSweep => self.sweep_tab_list(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn broadcast_with<F>(&mut self, handle: EntityHandle, build: F) -> Result<(), ReplicationError>
    where
        F: FnOnce(&mut ReplicatedEntity) -> Result<Packet, ReplicationError>,
    {
        let entity = self.entities.get_mut(handle).ok_or(ReplicationError::StaleHandle)?;
        let packet = build(entity)?;
        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        entity.broadcast(packet, &mut out);
        Ok(())
    }

    fn online_viewers(&self) -> Vec<ViewerState> {
        self.ctx
            .viewers
            .online_viewers()
            .into_iter()
            .filter_map(|id| self.ctx.viewers.viewer(id))
            .collect()
    }

    /// Reconciles one entity against every online viewer.
    fn reconcile_entity(&mut self, handle: EntityHandle) {
        for state in self.online_viewers() {
            self.reconcile_pair(handle, &state);
        }
    }

    fn reconcile_viewer(&mut self, viewer: ViewerId) {
        let Some(state) = self.ctx.viewers.viewer(viewer) else {
            debug!("Skipping reconciliation for offline viewer {}", viewer);
            return;
        };
        for handle in self.handles() {
            self.reconcile_pair(handle, &state);
        }
    }

    fn reconcile_pair(&mut self, handle: EntityHandle, state: &ViewerState) {
        let Some(entity) = self.entities.get_mut(handle) else {
            return;
        };
        if !entity.is_spawned() {
            return;
        }
        let eligible = self.policy.eligible(entity.visibility(), entity.transform(), state);
        match (eligible, entity.is_viewed_by(state.id)) {
            (true, false) => self.show(handle, state.id),
            (false, true) => self.hide(handle, state.id),
            (true, true) => {
                let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
                if entity.resync_viewer(state.id, &mut out) {
                    queue_tab_removal(&mut self.tab_list, entity, state.id);
                }
            }
            (false, false) => {}
        }
    }

    fn show(&mut self, handle: EntityHandle, viewer: ViewerId) {
        let Some(entity) = self.entities.get_mut(handle) else {
            return;
        };
        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        if entity.show_to(viewer, &mut out) {
            queue_tab_removal(&mut self.tab_list, entity, viewer);
        }
    }

    fn hide(&mut self, handle: EntityHandle, viewer: ViewerId) {
        let Some(entity) = self.entities.get_mut(handle) else {
            return;
        };
        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        if entity.hide_from(viewer, &mut out) && entity.uses_tab_list() {
            let id = entity.id();
            if let Some(entries) = self.tab_list.get_mut(&viewer) {
                entries.retain(|entry| entry.entity != id);
            }
        }
    }

    /// Adds `name` to the hidden-name-tag team of every online viewer.
    fn announce_hidden_name(&mut self, name: String) {
        let team = self.config.hidden_name_team.clone();
        let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
        for viewer in self.ctx.viewers.online_viewers() {
            out.send(
                viewer,
                Packet::TeamMembers {
                    team: team.clone(),
                    members: vec![name.clone()],
                },
            );
        }
    }

    /// Sends queued tab-list removals to viewers old enough to have loaded
    /// the skins; younger viewers stay queued, offline ones are dropped.
    fn sweep_tab_list(&mut self) {
        if self.tab_list.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.tab_list);
        let min_age = self.config.tab_list_min_connection_age();

        for (viewer, entries) in pending {
            if entries.is_empty() {
                continue;
            }
            let Some(state) = self.ctx.viewers.viewer(viewer) else {
                debug!(
                    "Dropping {} tab-list removals for offline viewer {}",
                    entries.len(),
                    viewer
                );
                continue;
            };
            if state.connection_age < min_age {
                self.tab_list.entry(viewer).or_default().extend(entries);
                continue;
            }

            let mut out = Outbox::new(self.ctx.packets.as_ref(), &mut self.stats);
            for entry in entries {
                out.send(
                    viewer,
                    Packet::PlayerInfo {
                        action: PlayerInfoAction::Remove,
                        uuid: entry.uuid,
                        display_name: entry.name,
                        texture: None,
                    },
                );
                out.stats().tab_list_removals += 1;
            }
        }
    }
}

/// Queues the deferred tab-list removal of a player-kind entity just shown
/// to `viewer`. An entry already waiting is not duplicated.
fn queue_tab_removal(
    tab_list: &mut HashMap<ViewerId, Vec<TabEntry>>,
    entity: &ReplicatedEntity,
    viewer: ViewerId,
) {
    if !entity.uses_tab_list() {
        return;
    }
    let (Some(uuid), Some(profile)) = (entity.uuid(), entity.player()) else {
        return;
    };
    let entries = tab_list.entry(viewer).or_default();
    if entries.iter().any(|entry| entry.entity == entity.id()) {
        return;
    }
    entries.push(TabEntry {
        entity: entity.id(),
        uuid,
        name: profile.name.clone(),
    });
}
