//! Scenario tests for the replication core.
//!
//! Every test drives a [`ReplicationCoordinator`] against [`MockHost`], an
//! in-memory host that records each packet per viewer and lets tests move,
//! age and disconnect viewers.

#[cfg(test)]
pub mod interaction_test;

#[cfg(test)]
pub mod lifecycle_test;


#[cfg(test)]
pub mod tab_list_test;


use crate::context::{PacketSink, ReplicationContext, ViewerDirectory, ViewerState, WorldQuery};
use crate::error::TransportError;
use crate::protocol::Packet;
use crate::types::{EntityId, Position, Transform, ViewerId, WorldId};
use crate::{ReplicationConfig, ReplicationCoordinator};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OVERWORLD: &str = "overworld";
pub const NETHER: &str = "nether";

/// Recording host: packet sink, viewer directory and world query in one.
#[derive(Debug, Default)]
pub struct MockHost {
    /// Maps viewer -> every packet it was sent, in order
    pub sent: Arc<Mutex<HashMap<ViewerId, Vec<Packet>>>>,
    viewers: Mutex<BTreeMap<ViewerId, ViewerState>>,
    native: Mutex<HashMap<WorldId, HashSet<i32>>>,
    failing: Mutex<HashSet<ViewerId>>,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        let host = Arc::new(Self::default());
        host.native.lock().unwrap().insert(WorldId::new(OVERWORLD), HashSet::new());
        host.native.lock().unwrap().insert(WorldId::new(NETHER), HashSet::new());
        host
    }

    /// Connects a viewer that has been online long enough for tab cleanup.
    pub fn add_viewer(&self, world: &str, x: f64) -> ViewerId {
        self.add_viewer_aged(world, x, Duration::from_secs(10))
    }

    pub fn add_viewer_aged(&self, world: &str, x: f64, age: Duration) -> ViewerId {
        let id = ViewerId::new();
        self.viewers.lock().unwrap().insert(
            id,
            ViewerState {
                id,
                transform: Transform::new(WorldId::new(world), Position::new(x, 64.0, 0.0)),
                connection_age: age,
            },
        );
        id
    }

    pub fn move_viewer(&self, id: ViewerId, x: f64) {
        if let Some(state) = self.viewers.lock().unwrap().get_mut(&id) {
            state.transform.position = Position::new(x, 64.0, 0.0);
        }
    }

    pub fn change_world(&self, id: ViewerId, world: &str, x: f64) {
        if let Some(state) = self.viewers.lock().unwrap().get_mut(&id) {
            state.transform = Transform::new(WorldId::new(world), Position::new(x, 64.0, 0.0));
        }
    }

    pub fn set_age(&self, id: ViewerId, age: Duration) {
        if let Some(state) = self.viewers.lock().unwrap().get_mut(&id) {
            state.connection_age = age;
        }
    }

    pub fn disconnect(&self, id: ViewerId) {
        self.viewers.lock().unwrap().remove(&id);
    }

    pub fn add_native(&self, world: &str, id: i32) {
        self.native
            .lock()
            .unwrap()
            .entry(WorldId::new(world))
            .or_default()
            .insert(id);
    }

    /// Makes every send to `id` fail until cleared.
    pub fn fail_sends_to(&self, id: ViewerId, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(id);
        } else {
            set.remove(&id);
        }
    }

    pub fn packets(&self, id: ViewerId) -> Vec<Packet> {
        self.sent.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn packet_names(&self, id: ViewerId) -> Vec<&'static str> {
        self.packets(id).iter().map(Packet::name).collect()
    }

    pub fn count(&self, id: ViewerId, name: &str) -> usize {
        self.packet_names(id).into_iter().filter(|n| *n == name).count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl PacketSink for MockHost {
    fn send(&self, viewer: ViewerId, packet: Packet) -> Result<(), TransportError> {
        if self.failing.lock().unwrap().contains(&viewer) {
            return Err(TransportError::Disconnected);
        }
        self.sent
            .lock()
            .unwrap()
            .entry(viewer)
            .or_insert_with(Vec::new)
            .push(packet);
        Ok(())
    }
}

impl ViewerDirectory for MockHost {
    fn online_viewers(&self) -> Vec<ViewerId> {
        self.viewers.lock().unwrap().keys().copied().collect()
    }

    fn viewer(&self, id: ViewerId) -> Option<ViewerState> {
        self.viewers.lock().unwrap().get(&id).cloned()
    }
}

impl WorldQuery for MockHost {
    fn loaded_worlds(&self) -> Vec<WorldId> {
        self.native.lock().unwrap().keys().cloned().collect()
    }

    fn has_entity(&self, world: &WorldId, id: EntityId) -> bool {
        self.native
            .lock()
            .unwrap()
            .get(world)
            .map(|ids| ids.contains(&id.0))
            .unwrap_or(false)
    }
}

/// Installs a test subscriber once so `RUST_LOG` works under `cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn setup() -> (Arc<MockHost>, ReplicationCoordinator) {
    setup_with(ReplicationConfig::default())
}

pub fn setup_with(config: ReplicationConfig) -> (Arc<MockHost>, ReplicationCoordinator) {
    init_tracing();
    let host = MockHost::new();
    let ctx = ReplicationContext::new(host.clone(), host.clone(), host.clone());
    let coordinator = ReplicationCoordinator::new(ctx, config).expect("default config is valid");
    (host, coordinator)
}

/// Transform in the overworld at `x`, on the same plane as mock viewers.
pub fn at(x: f64) -> Transform {
    Transform::new(WorldId::new(OVERWORLD), Position::new(x, 64.0, 0.0))
}

/// Runs `ticks` coordinator ticks.
pub fn run_ticks(coordinator: &mut ReplicationCoordinator, ticks: u64) {
    for _ in 0..ticks {
        coordinator.tick();
    }
}
