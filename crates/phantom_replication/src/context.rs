//! # Host Context
//!
//! The replication core never reaches for global state. Everything it needs
//! from the host simulation is passed in through a [`ReplicationContext`]
//! built once at startup:
//!
//! - [`PacketSink`] - delivers logical packets to one viewer
//! - [`ViewerDirectory`] - the connected viewers and where they are
//! - [`WorldQuery`] - loaded worlds and the ids of host-simulated entities
//!
//! All collaborators are invoked from the tick thread only.

use crate::error::TransportError;
use crate::protocol::Packet;
use crate::types::{EntityId, Transform, ViewerId, WorldId};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Delivers packets to connected viewers.
pub trait PacketSink: Send + Sync + Debug {
    /// Hands one packet to the transport for `viewer`.
    ///
    /// Returns `Err` when the packet could not be queued. Callers log the
    /// failure and keep their state; the next update resends.
    fn send(&self, viewer: ViewerId, packet: Packet) -> Result<(), TransportError>;
}

/// Snapshot of a connected viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub id: ViewerId,
    /// Current world and position
    pub transform: Transform,
    /// Time since the viewer's connection was established
    pub connection_age: Duration,
}

/// Read-only access to the host's session directory.
pub trait ViewerDirectory: Send + Sync + Debug {
    /// Ids of every currently connected viewer.
    fn online_viewers(&self) -> Vec<ViewerId>;

    /// Current state of a viewer, or `None` if it is not connected.
    fn viewer(&self, id: ViewerId) -> Option<ViewerState>;
}

/// Read-only access to the host's loaded worlds.
pub trait WorldQuery: Send + Sync + Debug {
    /// Every currently loaded world.
    fn loaded_worlds(&self) -> Vec<WorldId>;

    /// Whether a host-simulated entity in `world` currently holds `id`.
    fn has_entity(&self, world: &WorldId, id: EntityId) -> bool;
}

/// Explicit bundle of host collaborators handed to the replication core.
#[derive(Debug, Clone)]
pub struct ReplicationContext {
    pub packets: Arc<dyn PacketSink>,
    pub viewers: Arc<dyn ViewerDirectory>,
    pub worlds: Arc<dyn WorldQuery>,
}

impl ReplicationContext {
    pub fn new(
        packets: Arc<dyn PacketSink>,
        viewers: Arc<dyn ViewerDirectory>,
        worlds: Arc<dyn WorldQuery>,
    ) -> Self {
        Self {
            packets,
            viewers,
            worlds,
        }
    }
}
