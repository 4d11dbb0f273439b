//! Replication counters and the outbox that maintains them.

use crate::context::PacketSink;
use crate::protocol::Packet;
use crate::types::ViewerId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Running totals for the replication core.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationStats {
    /// Packets accepted by the transport
    pub packets_sent: u64,
    /// Packets the transport refused
    pub transport_failures: u64,
    /// Spawn sequences started for a viewer
    pub spawns: u64,
    /// Despawns for a viewer, with or without a packet
    pub despawns: u64,
    /// Spawn sequences resent to viewers that missed a packet
    pub resyncs: u64,
    /// Non-empty metadata deltas sent
    pub metadata_deltas: u64,
    /// Inbound interactions consumed by the router
    pub interactions_routed: u64,
    /// Observer calls that failed or panicked
    pub observer_failures: u64,
    /// Tab-list removals sent by the sweep
    pub tab_list_removals: u64,
}

/// Sends packets through a [`PacketSink`], logging and counting failures.
pub(crate) struct Outbox<'a> {
    sink: &'a dyn PacketSink,
    stats: &'a mut ReplicationStats,
}

impl<'a> Outbox<'a> {
    pub(crate) fn new(sink: &'a dyn PacketSink, stats: &'a mut ReplicationStats) -> Self {
        Self { sink, stats }
    }

    /// Sends one packet; returns whether the transport accepted it.
    pub(crate) fn send(&mut self, viewer: ViewerId, packet: Packet) -> bool {
        let name = packet.name();
        match self.sink.send(viewer, packet) {
            Ok(()) => {
                self.stats.packets_sent += 1;
                debug!("📤 {} -> viewer {}", name, viewer);
                true
            }
            Err(e) => {
                self.stats.transport_failures += 1;
                warn!("⚠️ Failed to send {} to viewer {}: {}", name, viewer, e);
                false
            }
        }
    }

    pub(crate) fn stats(&mut self) -> &mut ReplicationStats {
        &mut *self.stats
    }
}
