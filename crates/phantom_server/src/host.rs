//! # Simulated Host
//!
//! An in-memory stand-in for a real game server: a session directory of
//! viewers walking around, a set of loaded worlds with host-simulated
//! entities, and a packet sink that encodes packets as JSON and logs them.
//!
//! The replication core only sees this through the [`PacketSink`],
//! [`ViewerDirectory`] and [`WorldQuery`] traits. The tick loop drives the
//! simulation with [`SimulatedHost::step`] and forwards the returned
//! [`ViewerEvent`]s to the coordinator.

use crate::config::DemoSettings;
use phantom_replication::{
    EntityId, Packet, PacketSink, Position, ReplicationContext, Transform, TransportError,
    ViewerDirectory, ViewerId, ViewerState, WorldId, WorldQuery,
};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Height every simulated viewer walks at.
pub const GROUND_Y: f64 = 64.0;

/// Ticks a viewer needs to walk once around its circle.
const LAP_TICKS: f64 = 600.0;

/// Something that happened to a viewer during a simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    Joined(ViewerId),
    Moved(ViewerId),
    Teleported(ViewerId),
    ChangedWorld(ViewerId),
    Quit(ViewerId),
}

#[derive(Debug, Clone)]
struct SimViewer {
    world: usize,
    position: Position,
    /// Starting angle on the walking circle
    phase: f64,
    connected_at: Instant,
}

impl SimViewer {
    fn transform(&self, worlds: &[WorldId]) -> Transform {
        let world = worlds[self.world % worlds.len()].clone();
        Transform::new(world, self.position)
    }
}

/// Transport counters of the simulated host.
#[derive(Debug, Default)]
pub struct TransportStats {
    pub packets: AtomicU64,
    pub bytes: AtomicU64,
    pub refused: AtomicU64,
}

/// In-memory host world.
#[derive(Debug)]
pub struct SimulatedHost {
    worlds: Vec<WorldId>,
    viewers: Mutex<BTreeMap<ViewerId, SimViewer>>,
    native_entities: i32,
    wander_radius: f64,
    world_hop_interval: u64,
    churn_interval: u64,
    transport: TransportStats,
}

impl SimulatedHost {
    pub fn new(settings: &DemoSettings) -> Self {
        Self {
            worlds: settings.worlds.iter().map(WorldId::new).collect(),
            viewers: Mutex::new(BTreeMap::new()),
            native_entities: settings.native_entities,
            wander_radius: settings.wander_radius,
            world_hop_interval: settings.world_hop_interval_ticks,
            churn_interval: settings.churn_interval_ticks,
            transport: TransportStats::default(),
        }
    }

    /// Bundles this host into the context handed to the replication core.
    pub fn context(self: &Arc<Self>) -> ReplicationContext {
        ReplicationContext::new(self.clone(), self.clone(), self.clone())
    }

    /// The world every phantom of the demo lives in.
    pub fn home_world(&self) -> WorldId {
        self.worlds
            .first()
            .cloned()
            .unwrap_or_else(|| WorldId::new("overworld"))
    }

    pub fn transport(&self) -> &TransportStats {
        &self.transport
    }

    /// Connects a new viewer on the walking circle of the home world.
    pub fn connect(&self) -> ViewerId {
        let id = ViewerId::new();
        let mut viewers = self.lock_viewers();
        let phase = viewers.len() as f64 * 0.9;
        let viewer = SimViewer {
            world: 0,
            position: self.circle_point(phase),
            phase,
            connected_at: Instant::now(),
        };
        viewers.insert(id, viewer);
        info!("🔗 Viewer {} connected", id);
        id
    }

    /// Disconnects a viewer. Returns whether it was connected.
    pub fn disconnect(&self, id: ViewerId) -> bool {
        let removed = self.lock_viewers().remove(&id).is_some();
        if removed {
            info!("👋 Viewer {} disconnected", id);
        }
        removed
    }

    /// Some connected viewer, if any.
    pub fn any_viewer(&self) -> Option<ViewerId> {
        self.lock_viewers().keys().next().copied()
    }

    pub fn viewer_count(&self) -> usize {
        self.lock_viewers().len()
    }

    /// Advances the simulation by one tick.
    ///
    /// Every viewer takes a step along its circle. Every
    /// `world_hop_interval` ticks one viewer, picked round-robin, moves to
    /// the next world and the next one teleports back to the origin. Every
    /// `churn_interval` ticks the longest-connected viewer quits and a
    /// fresh one joins.
    pub fn step(&self, tick: u64) -> Vec<ViewerEvent> {
        let mut events = Vec::new();

        if self.churn_interval > 0 && tick > 0 && tick % self.churn_interval == 0 {
            let oldest = self
                .lock_viewers()
                .iter()
                .min_by_key(|(_, viewer)| viewer.connected_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                self.disconnect(oldest);
                events.push(ViewerEvent::Quit(oldest));
                events.push(ViewerEvent::Joined(self.connect()));
            }
        }

        let mut viewers = self.lock_viewers();

        let angle_step = TAU / LAP_TICKS;
        for (id, viewer) in viewers.iter_mut() {
            let angle = viewer.phase + tick as f64 * angle_step;
            viewer.position = self.circle_point(angle);
            events.push(ViewerEvent::Moved(*id));
        }

        if self.world_hop_interval > 0 && tick > 0 && tick % self.world_hop_interval == 0 && !viewers.is_empty() {
            let round = (tick / self.world_hop_interval) as usize;
            let ids: Vec<ViewerId> = viewers.keys().copied().collect();

            let hopper = ids[round % ids.len()];
            if self.worlds.len() > 1 {
                if let Some(viewer) = viewers.get_mut(&hopper) {
                    viewer.world = (viewer.world + 1) % self.worlds.len();
                    events.push(ViewerEvent::ChangedWorld(hopper));
                }
            }

            let jumper = ids[(round + 1) % ids.len()];
            if let Some(viewer) = viewers.get_mut(&jumper) {
                viewer.position = Position::new(0.0, GROUND_Y, 0.0);
                viewer.phase = -(tick as f64) * angle_step;
                events.push(ViewerEvent::Teleported(jumper));
            }
        }

        events
    }

    fn circle_point(&self, angle: f64) -> Position {
        Position::new(
            self.wander_radius * angle.cos(),
            GROUND_Y,
            self.wander_radius * angle.sin(),
        )
    }

    fn lock_viewers(&self) -> std::sync::MutexGuard<'_, BTreeMap<ViewerId, SimViewer>> {
        // A panic while holding the lock leaves positions that are still usable.
        self.viewers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PacketSink for SimulatedHost {
    fn send(&self, viewer: ViewerId, packet: Packet) -> Result<(), TransportError> {
        if !self.lock_viewers().contains_key(&viewer) {
            self.transport.refused.fetch_add(1, Ordering::Relaxed);
            return Err(TransportError::Disconnected);
        }

        let bytes = packet.encode_json()?;
        self.transport.packets.fetch_add(1, Ordering::Relaxed);
        self.transport.bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        debug!(
            "📦 {} -> {} ({} bytes): {}",
            packet.name(),
            viewer,
            bytes.len(),
            String::from_utf8_lossy(&bytes)
        );
        Ok(())
    }
}

impl ViewerDirectory for SimulatedHost {
    fn online_viewers(&self) -> Vec<ViewerId> {
        self.lock_viewers().keys().copied().collect()
    }

    fn viewer(&self, id: ViewerId) -> Option<ViewerState> {
        self.lock_viewers().get(&id).map(|viewer| ViewerState {
            id,
            transform: viewer.transform(&self.worlds),
            connection_age: viewer.connected_at.elapsed(),
        })
    }
}

impl WorldQuery for SimulatedHost {
    fn loaded_worlds(&self) -> Vec<WorldId> {
        self.worlds.clone()
    }

    fn has_entity(&self, world: &WorldId, id: EntityId) -> bool {
        self.worlds.contains(world) && id.0 >= 1 && id.0 <= self.native_entities
    }
}
