//! # Capability Groups
//!
//! Orthogonal state blocks layered on the common entity core. Which blocks
//! are present is decided once by [`EntityKind`] at creation time; accessors
//! on [`super::ReplicatedEntity`] report a missing block as
//! [`crate::ReplicationError::CapabilityMissing`].

use super::kind::EntityKind;
use crate::protocol::{EquipmentSlot, ItemStack, SignedTexture};
use crate::types::{BlockPos, EntityHandle, Rotation};
use serde::{Deserialize, Serialize};

/// Default maximum health of living kinds.
pub const DEFAULT_MAX_HEALTH: f32 = 20.0;

/// Visual flags shared by every kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualFlags {
    pub on_fire: bool,
    pub crouched: bool,
    pub sprinting: bool,
    pub invisible: bool,
    pub no_gravity: bool,
    pub custom_name: Option<String>,
    pub name_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            current: DEFAULT_MAX_HEALTH,
            max: DEFAULT_MAX_HEALTH,
        }
    }
}

impl Health {
    /// Sets the current health, clamped to `0.0..=max`.
    pub fn set(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ageable {
    pub baby: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tameable {
    pub sitting: bool,
    pub tamed: bool,
    pub owner: Option<String>,
}

/// Six equipment slots plus the state last sent to viewers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    slots: [Option<ItemStack>; 6],
    sent: [Option<ItemStack>; 6],
}

impl Gear {
    pub fn set(&mut self, slot: EquipmentSlot, item: Option<ItemStack>) {
        self.slots[slot.index()] = item;
    }

    pub fn get(&self, slot: EquipmentSlot) -> Option<&ItemStack> {
        self.slots[slot.index()].as_ref()
    }

    /// Occupied slots as last sent, for spawn sequences.
    pub fn synced(&self) -> Vec<(EquipmentSlot, ItemStack)> {
        EquipmentSlot::ALL
            .iter()
            .filter_map(|slot| {
                self.sent[slot.index()]
                    .as_ref()
                    .map(|item| (*slot, item.clone()))
            })
            .collect()
    }

    /// Slots whose content differs from what was last sent.
    pub fn changed(&self) -> Vec<(EquipmentSlot, Option<ItemStack>)> {
        EquipmentSlot::ALL
            .iter()
            .filter(|slot| self.slots[slot.index()] != self.sent[slot.index()])
            .map(|slot| (*slot, self.slots[slot.index()].clone()))
            .collect()
    }

    pub(crate) fn mark_sent(&mut self) {
        self.sent = self.slots.clone();
    }
}

/// Armor-stand flag bits and limb poses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmorStandPose {
    pub small: bool,
    pub arms: bool,
    pub no_baseplate: bool,
    pub marker: bool,
    pub head: Rotation,
    pub body: Rotation,
    pub left_arm: Rotation,
    pub right_arm: Rotation,
    pub left_leg: Rotation,
    pub right_leg: Rotation,
}

/// Identity and presentation of a player-kind entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Tab-list and name-tag name
    pub name: String,
    pub texture: Option<SignedTexture>,
    /// Skin-layer byte, see [`crate::metadata::skin_bits`]
    pub skin_layers: u8,
    /// Join the hidden-name-tag team; read on spawn and on viewer join
    pub hide_name_tag: bool,
    /// Bed the entity is lying in
    pub sleeping: Option<BlockPos>,
    /// Invisible armor stand the entity rides while sitting
    #[serde(skip)]
    pub seat: Option<EntityHandle>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            texture: None,
            skin_layers: crate::metadata::skin_bits::ALL,
            hide_name_tag: false,
            sleeping: None,
            seat: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreeperState {
    pub charged: bool,
    pub ignited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatState {
    pub awake: bool,
}

impl Default for BatState {
    fn default() -> Self {
        Self { awake: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FallingBlock {
    /// Client block-state id carried as spawn object data
    pub block_state: i32,
}

/// The capability blocks present on one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub health: Option<Health>,
    pub ageable: Option<Ageable>,
    pub tameable: Option<Tameable>,
    pub gear: Option<Gear>,
    pub armor_stand: Option<ArmorStandPose>,
    pub player: Option<PlayerProfile>,
    pub creeper: Option<CreeperState>,
    pub bat: Option<BatState>,
    pub falling_block: Option<FallingBlock>,
}

impl Capabilities {
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            health: kind.has_health().then(Health::default),
            ageable: kind.is_ageable().then(Ageable::default),
            tameable: (kind == EntityKind::Tameable).then(Tameable::default),
            gear: kind.has_gear().then(Gear::default),
            armor_stand: (kind == EntityKind::ArmorStand).then(ArmorStandPose::default),
            player: (kind == EntityKind::Player).then(PlayerProfile::default),
            creeper: (kind == EntityKind::Creeper).then(CreeperState::default),
            bat: (kind == EntityKind::Bat).then(BatState::default),
            falling_block: (kind == EntityKind::FallingBlock).then(FallingBlock::default),
        }
    }
}
