//! Packet sequences for one entity and one viewer.
//!
//! These helpers only touch the entity's own state. Deciding *who* should
//! see an entity is the coordinator's job.

use super::{EntityKind, ReplicatedEntity};
use crate::protocol::{Packet, PlayerInfoAction};
use crate::stats::Outbox;
use crate::types::{Transform, Velocity, ViewerId};

impl ReplicatedEntity {
    /// Full spawn sequence for `viewer`, in send order.
    ///
    /// Metadata and equipment come from the last-broadcast snapshots, not
    /// the live state; pending changes reach this viewer with the next delta.
    pub(crate) fn spawn_packets(&self, viewer: ViewerId) -> Vec<Packet> {
        let mut packets = Vec::new();

        if let Some(info) = self.player_info(PlayerInfoAction::Add) {
            packets.push(info);
        }

        let position = self.transform.position;
        let data = self
            .capabilities
            .falling_block
            .map(|block| block.block_state)
            .unwrap_or_default();
        packets.push(Packet::Spawn {
            shape: self.kind.shape(),
            type_name: self.type_name.clone(),
            id: self.id,
            uuid: self.uuid,
            x: position.x,
            y: position.y,
            z: position.z,
            yaw: self.transform.yaw,
            pitch: self.transform.pitch,
            data,
            metadata: self.watcher.synced_for(&self.overrides_for(viewer)),
        });

        if let Some(gear) = &self.capabilities.gear {
            for (slot, item) in gear.synced() {
                packets.push(Packet::Equipment {
                    id: self.id,
                    slot,
                    item: Some(item),
                });
            }
        }

        packets.push(Packet::HeadRotation {
            id: self.id,
            yaw: self.head_yaw,
        });

        if let Some(bed) = self.player().and_then(|profile| profile.sleeping) {
            packets.push(Packet::Bed {
                id: self.id,
                position: Some(bed),
            });
        }

        if !self.passengers.is_empty() {
            packets.push(self.mount_packet());
        }

        packets
    }

    /// Destroy sequence for one viewer; player kinds also leave the tab list.
    pub(crate) fn despawn_packets(&self) -> Vec<Packet> {
        let mut packets = vec![Packet::Despawn { ids: vec![self.id] }];
        if let Some(info) = self.player_info(PlayerInfoAction::Remove) {
            packets.push(info);
        }
        packets
    }

    /// Player-info entry for player kinds, `None` for everything else.
    pub(crate) fn player_info(&self, action: PlayerInfoAction) -> Option<Packet> {
        let profile = self.player()?;
        let uuid = self.uuid?;
        Some(Packet::PlayerInfo {
            action,
            uuid,
            display_name: profile.name.clone(),
            texture: match action {
                PlayerInfoAction::Add => profile.texture.clone(),
                PlayerInfoAction::Remove => None,
            },
        })
    }

    pub(crate) fn mount_packet(&self) -> Packet {
        Packet::Mount {
            id: self.id,
            passengers: self.passengers.to_vec(),
        }
    }

    /// Movement packet from the current transform to `to`.
    pub(crate) fn move_packet(&self, to: &Transform, teleport_threshold_squared: f64) -> Packet {
        let from = self.transform.position;
        if from.distance_squared(to.position) <= teleport_threshold_squared {
            Packet::RelativeMove {
                id: self.id,
                dx: to.position.x - from.x,
                dy: to.position.y - from.y,
                dz: to.position.z - from.z,
                yaw: to.yaw,
                pitch: to.pitch,
            }
        } else {
            Packet::Teleport {
                id: self.id,
                x: to.position.x,
                y: to.position.y,
                z: to.position.z,
                yaw: to.yaw,
                pitch: to.pitch,
            }
        }
    }

    pub(crate) fn velocity_packet(&self, velocity: Velocity) -> Packet {
        Packet::Velocity {
            id: self.id,
            vx: velocity.x,
            vy: velocity.y,
            vz: velocity.z,
        }
    }

    /// Spawns the entity for `viewer` unless it already holds a copy.
    ///
    /// The viewer is recorded even when a send fails, and marked for resync.
    pub(crate) fn show_to(&mut self, viewer: ViewerId, out: &mut Outbox<'_>) -> bool {
        if !self.viewers.insert(viewer) {
            return false;
        }
        if !self.send_spawn_sequence(viewer, out) {
            self.resync.insert(viewer);
        }
        out.stats().spawns += 1;
        true
    }

    /// Resends the spawn sequence to `viewer` if it is marked for resync.
    /// Returns whether a resent sequence got through.
    pub(crate) fn resync_viewer(&mut self, viewer: ViewerId, out: &mut Outbox<'_>) -> bool {
        if !self.resync.contains(&viewer) {
            return false;
        }
        out.stats().resyncs += 1;
        let delivered = self.send_spawn_sequence(viewer, out);
        if delivered {
            self.resync.remove(&viewer);
        }
        delivered
    }

    fn send_spawn_sequence(&self, viewer: ViewerId, out: &mut Outbox<'_>) -> bool {
        let mut delivered = true;
        for packet in self.spawn_packets(viewer) {
            delivered &= out.send(viewer, packet);
        }
        delivered
    }

    /// Destroys the entity for `viewer` if it holds a copy.
    pub(crate) fn hide_from(&mut self, viewer: ViewerId, out: &mut Outbox<'_>) -> bool {
        if !self.viewers.remove(&viewer) {
            return false;
        }
        self.resync.remove(&viewer);
        for packet in self.despawn_packets() {
            out.send(viewer, packet);
        }
        out.stats().despawns += 1;
        true
    }

    /// Sends `packet` to every current viewer.
    pub(crate) fn broadcast(&mut self, packet: Packet, out: &mut Outbox<'_>) {
        for viewer in &self.viewers {
            if !out.send(*viewer, packet.clone()) {
                self.resync.insert(*viewer);
            }
        }
    }

    /// Sends the metadata and equipment delta, plus the mount list, to
    /// every viewer, then advances the shared snapshots.
    ///
    /// Viewers marked for resync first get their spawn sequence again; those
    /// that received it are returned. A viewer that misses any packet here is
    /// marked for the next round.
    pub(crate) fn broadcast_update(&mut self, out: &mut Outbox<'_>) -> Vec<ViewerId> {
        self.refresh_metadata();

        let shared = self.watcher.delta();
        let gear_changes = self
            .capabilities
            .gear
            .as_ref()
            .map(|gear| gear.changed())
            .unwrap_or_default();

        let mut resynced = Vec::new();
        let viewers: Vec<ViewerId> = self.viewers.iter().copied().collect();
        for viewer in viewers {
            if self.resync_viewer(viewer, out) {
                resynced.push(viewer);
            }
            if self.resync.contains(&viewer) {
                continue;
            }

            let mut delivered = true;
            let fields = if self.name_provider.is_some() {
                self.watcher.delta_for(&self.overrides_for(viewer))
            } else {
                shared.clone()
            };
            if !fields.is_empty() {
                delivered &= out.send(viewer, Packet::MetadataDelta { id: self.id, fields });
                out.stats().metadata_deltas += 1;
            }

            for (slot, item) in &gear_changes {
                delivered &= out.send(
                    viewer,
                    Packet::Equipment {
                        id: self.id,
                        slot: *slot,
                        item: item.clone(),
                    },
                );
            }

            if !self.passengers.is_empty() {
                delivered &= out.send(viewer, self.mount_packet());
            }

            if !delivered {
                self.resync.insert(viewer);
            }
        }

        self.commit_snapshots();
        resynced
    }

    /// Records the current metadata and equipment as broadcast.
    pub(crate) fn commit_snapshots(&mut self) {
        self.watcher.commit();
        if let Some(gear) = self.capabilities.gear.as_mut() {
            gear.mark_sent();
        }
    }

    /// Whether this kind appears in viewers' tab lists when spawned.
    pub(crate) fn uses_tab_list(&self) -> bool {
        self.kind == EntityKind::Player
    }
}
