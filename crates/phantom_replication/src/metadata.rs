//! # Metadata State Watcher
//!
//! Client-visible entity state is addressed by small numeric indices. The
//! [`StateWatcher`] keeps two ordered snapshots of those fields: `current`,
//! re-derived from the entity on every refresh, and `last`, the state most
//! recently broadcast to every viewer. Updates send only the fields that
//! differ between the two.
//!
//! Indices are scoped by entity kind: index 13 is the skin-layer byte on a
//! player and the charged flag on a creeper. The constants below name each
//! index per kind family.
//!
//! Per-viewer values (conditional display names) never touch the shared
//! snapshots. They travel in a [`ViewerOverrides`] map that is applied on top
//! of the shared delta at transmission time.

use crate::protocol::{MetadataField, MetadataValue};
use std::collections::BTreeMap;

// Base entity
pub const STATUS_FLAGS: u8 = 0;
pub const CUSTOM_NAME: u8 = 2;
pub const CUSTOM_NAME_VISIBLE: u8 = 3;
pub const NO_GRAVITY: u8 = 5;
// Living entity
pub const HEALTH: u8 = 7;
// Armor stand
pub const ARMOR_STAND_FLAGS: u8 = 11;
pub const ARMOR_STAND_HEAD_POSE: u8 = 12;
pub const ARMOR_STAND_BODY_POSE: u8 = 13;
pub const ARMOR_STAND_LEFT_ARM_POSE: u8 = 14;
pub const ARMOR_STAND_RIGHT_ARM_POSE: u8 = 15;
pub const ARMOR_STAND_LEFT_LEG_POSE: u8 = 16;
pub const ARMOR_STAND_RIGHT_LEG_POSE: u8 = 17;
// Ageable
pub const AGEABLE_BABY: u8 = 12;
// Player
pub const PLAYER_SKIN_LAYERS: u8 = 13;
// Creeper
pub const CREEPER_CHARGED: u8 = 13;
pub const CREEPER_IGNITED: u8 = 14;
// Bat
pub const BAT_AWAKE: u8 = 13;
// Tameable
pub const TAMEABLE_FLAGS: u8 = 13;
pub const TAMEABLE_OWNER: u8 = 14;

/// Bits of the shared status byte (index 0).
pub mod status_bits {
    pub const ON_FIRE: u8 = 1 << 0;
    pub const CROUCHED: u8 = 1 << 1;
    pub const SPRINTING: u8 = 1 << 3;
    pub const INVISIBLE: u8 = 1 << 5;
}

/// Bits of the armor-stand flag byte (index 11).
pub mod armor_stand_bits {
    pub const SMALL: u8 = 1 << 0;
    pub const HAS_ARMS: u8 = 1 << 2;
    pub const NO_BASEPLATE: u8 = 1 << 3;
    pub const MARKER: u8 = 1 << 4;
}

/// Bits of the tameable flag byte (index 13).
pub mod tameable_bits {
    pub const SITTING: u8 = 1 << 0;
    pub const TAMED: u8 = 1 << 2;
}

/// Bits of the player skin-layer byte (index 13).
pub mod skin_bits {
    pub const CAPE: u8 = 1 << 0;
    pub const JACKET: u8 = 1 << 1;
    pub const LEFT_SLEEVE: u8 = 1 << 2;
    pub const RIGHT_SLEEVE: u8 = 1 << 3;
    pub const LEFT_PANTS: u8 = 1 << 4;
    pub const RIGHT_PANTS: u8 = 1 << 5;
    pub const HAT: u8 = 1 << 6;
    pub const ALL: u8 = 0x7f;
}

/// Packs `(bit, enabled)` pairs into a byte, starting from zero.
pub fn pack_bits(bits: &[(u8, bool)]) -> u8 {
    bits.iter()
        .filter(|(_, enabled)| *enabled)
        .fold(0u8, |acc, (bit, _)| acc | bit)
}

/// Ordered index → value map.
pub type MetadataMap = BTreeMap<u8, MetadataValue>;

/// Per-viewer field values that bypass the shared diff snapshot.
///
/// Fields in this map are always sent to their viewer, replacing whatever
/// the shared snapshot holds at the same index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerOverrides {
    fields: MetadataMap,
}

impl ViewerOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: u8, value: MetadataValue) {
        self.fields.insert(index, value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn apply(&self, mut fields: MetadataMap) -> Vec<MetadataField> {
        for (index, value) in &self.fields {
            fields.insert(*index, value.clone());
        }
        into_fields(fields)
    }
}

/// Tracks current vs. last-broadcast metadata and computes deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateWatcher {
    current: MetadataMap,
    last: MetadataMap,
}

impl StateWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot with freshly derived fields.
    pub fn refresh(&mut self, fields: MetadataMap) {
        self.current = fields;
    }

    pub fn current(&self) -> &MetadataMap {
        &self.current
    }

    pub fn last(&self) -> &MetadataMap {
        &self.last
    }

    pub fn get(&self, index: u8) -> Option<&MetadataValue> {
        self.current.get(&index)
    }

    /// Fields that are new or changed since the last commit.
    pub fn delta(&self) -> Vec<MetadataField> {
        into_fields(self.changed())
    }

    /// Last-broadcast state with a viewer's overrides substituted.
    ///
    /// Spawn sequences are built from this snapshot so that a newly shown
    /// viewer holds exactly what every other viewer holds, and the next
    /// delta applies to it unchanged.
    pub fn synced_for(&self, overrides: &ViewerOverrides) -> Vec<MetadataField> {
        overrides.apply(self.last.clone())
    }

    /// Delta with a viewer's overrides substituted and always included.
    pub fn delta_for(&self, overrides: &ViewerOverrides) -> Vec<MetadataField> {
        overrides.apply(self.changed())
    }

    /// Records the current snapshot as broadcast.
    pub fn commit(&mut self) {
        self.last = self.current.clone();
    }

    fn changed(&self) -> MetadataMap {
        self.current
            .iter()
            .filter(|(index, value)| self.last.get(index) != Some(*value))
            .map(|(index, value)| (*index, value.clone()))
            .collect()
    }
}

fn into_fields(map: MetadataMap) -> Vec<MetadataField> {
    map.into_iter()
        .map(|(index, value)| MetadataField::new(index, value))
        .collect()
}
