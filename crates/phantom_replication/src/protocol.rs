//! # Logical Packet Definitions
//!
//! The packets the replication core needs from the transport collaborator.
//! These are logical messages: the host decides how each one is framed on
//! the wire. All packets serialize with serde so hosts without a native
//! codec can ship them as JSON.

use crate::error::TransportError;
use crate::types::{BlockPos, EntityId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shape of the spawn packet a kind is materialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnShape {
    /// Living entity spawn (mobs, armor stands)
    Living,
    /// Non-living object spawn (falling blocks)
    Object,
    /// Named player spawn, preceded by a player-info entry
    Player,
}

/// A single typed metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    Byte(u8),
    Bool(bool),
    Float(f32),
    Int(i32),
    Text(String),
    /// Pose vector in degrees
    Rotation([f32; 3]),
}

/// One indexed metadata entry as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    pub index: u8,
    pub value: MetadataValue,
}

impl MetadataField {
    pub fn new(index: u8, value: MetadataValue) -> Self {
        Self { index, value }
    }
}

/// Equipment slots of a gear-carrying entity, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    MainHand,
    OffHand,
    Head,
    Chest,
    Legs,
    Feet,
}

impl EquipmentSlot {
    /// All slots in wire order.
    pub const ALL: [EquipmentSlot; 6] = [
        EquipmentSlot::MainHand,
        EquipmentSlot::OffHand,
        EquipmentSlot::Head,
        EquipmentSlot::Chest,
        EquipmentSlot::Legs,
        EquipmentSlot::Feet,
    ];

    /// Position of the slot in [`EquipmentSlot::ALL`].
    pub fn index(self) -> usize {
        match self {
            EquipmentSlot::MainHand => 0,
            EquipmentSlot::OffHand => 1,
            EquipmentSlot::Head => 2,
            EquipmentSlot::Chest => 3,
            EquipmentSlot::Legs => 4,
            EquipmentSlot::Feet => 5,
        }
    }
}

/// An item shown in an equipment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item type name, e.g. `"diamond_sword"`
    pub item: String,
    pub count: u8,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u8) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }
}

/// One-shot entity animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Hurt,
    Dead,
    BreedHeart,
    BreedSmoke,
    Generic,
    /// Any other client status code
    Custom(u8),
}

impl EntityStatus {
    /// Wire status code.
    pub fn code(self) -> u8 {
        match self {
            EntityStatus::Hurt => 2,
            EntityStatus::Dead => 3,
            EntityStatus::BreedHeart => 6,
            EntityStatus::BreedSmoke => 7,
            EntityStatus::Generic => 18,
            EntityStatus::Custom(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerInfoAction {
    Add,
    Remove,
}

/// A signed skin texture property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTexture {
    pub value: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTagVisibility {
    Always,
    Never,
    HideForOtherTeams,
    HideForOwnTeam,
}

/// Outgoing logical packets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "packet", rename_all = "snake_case")]
pub enum Packet {
    Spawn {
        shape: SpawnShape,
        type_name: String,
        id: EntityId,
        uuid: Option<Uuid>,
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        /// Object data (block state for falling blocks, 0 otherwise)
        data: i32,
        metadata: Vec<MetadataField>,
    },
    Despawn {
        ids: Vec<EntityId>,
    },
    MetadataDelta {
        id: EntityId,
        fields: Vec<MetadataField>,
    },
    RelativeMove {
        id: EntityId,
        dx: f64,
        dy: f64,
        dz: f64,
        yaw: f32,
        pitch: f32,
    },
    Teleport {
        id: EntityId,
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
    },
    Velocity {
        id: EntityId,
        vx: f64,
        vy: f64,
        vz: f64,
    },
    Equipment {
        id: EntityId,
        slot: EquipmentSlot,
        item: Option<ItemStack>,
    },
    Mount {
        id: EntityId,
        passengers: Vec<EntityId>,
    },
    Status {
        id: EntityId,
        status: u8,
    },
    HeadRotation {
        id: EntityId,
        yaw: f32,
    },
    PlayerInfo {
        action: PlayerInfoAction,
        uuid: Uuid,
        display_name: String,
        texture: Option<SignedTexture>,
    },
    Bed {
        id: EntityId,
        position: Option<BlockPos>,
    },
    TeamRegistration {
        team: String,
        name_tag_visibility: NameTagVisibility,
        members: Vec<String>,
    },
    /// Adds members to a team the viewer already knows
    TeamMembers {
        team: String,
        members: Vec<String>,
    },
}

impl Packet {
    /// Short packet name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::Spawn { .. } => "spawn",
            Packet::Despawn { .. } => "despawn",
            Packet::MetadataDelta { .. } => "metadata",
            Packet::RelativeMove { .. } => "relative_move",
            Packet::Teleport { .. } => "teleport",
            Packet::Velocity { .. } => "velocity",
            Packet::Equipment { .. } => "equipment",
            Packet::Mount { .. } => "mount",
            Packet::Status { .. } => "status",
            Packet::HeadRotation { .. } => "head_rotation",
            Packet::PlayerInfo { .. } => "player_info",
            Packet::Bed { .. } => "bed",
            Packet::TeamRegistration { .. } => "team",
            Packet::TeamMembers { .. } => "team_members",
        }
    }

    /// Encodes the packet as JSON for hosts without a native codec.
    pub fn encode_json(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Raw interaction type as received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawInteraction {
    Interact,
    Attack,
    InteractAt,
    Unknown(i32),
}

impl From<i32> for RawInteraction {
    fn from(code: i32) -> Self {
        match code {
            0 => RawInteraction::Interact,
            1 => RawInteraction::Attack,
            2 => RawInteraction::InteractAt,
            other => RawInteraction::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EntityStatus::BreedHeart.code(), 6);
        assert_eq!(EntityStatus::BreedSmoke.code(), 7);
        assert_eq!(EntityStatus::Generic.code(), 18);
        assert_eq!(EntityStatus::Custom(42).code(), 42);
    }

    #[test]
    fn test_slot_order_matches_index() {
        for (i, slot) in EquipmentSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_raw_interaction_codes() {
        assert_eq!(RawInteraction::from(1), RawInteraction::Attack);
        assert_eq!(RawInteraction::from(7), RawInteraction::Unknown(7));
    }

    #[test]
    fn test_packet_json_is_tagged() {
        let packet = Packet::Despawn {
            ids: vec![EntityId(5)],
        };
        let json: serde_json::Value =
            serde_json::from_slice(&packet.encode_json().unwrap()).unwrap();
        assert_eq!(json["packet"], "despawn");
        assert_eq!(json["ids"][0], 5);
    }
}
