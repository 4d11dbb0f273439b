//! Entity kinds and the capability groups each one carries.

use super::capability::Capabilities;
use crate::protocol::SpawnShape;
use serde::{Deserialize, Serialize};

/// Discriminator selecting spawn shape, metadata layout and capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Plain hostile or neutral mob
    Mob,
    /// Ambient creature without special metadata
    Ambient,
    /// Breedable animal
    Animal,
    /// Any mob with a baby variant
    Ageable,
    /// Animal that can be tamed and told to sit
    Tameable,
    /// Mob wearing visible equipment
    Gear,
    Creeper,
    Bat,
    /// Humanoid rendered through the player spawn path
    Player,
    ArmorStand,
    FallingBlock,
}

impl EntityKind {
    /// Which spawn packet materializes this kind.
    pub fn shape(self) -> SpawnShape {
        match self {
            EntityKind::Player => SpawnShape::Player,
            EntityKind::FallingBlock => SpawnShape::Object,
            _ => SpawnShape::Living,
        }
    }

    /// Whether the kind carries a health field.
    pub fn has_health(self) -> bool {
        !matches!(self, EntityKind::ArmorStand | EntityKind::FallingBlock)
    }

    /// Whether the kind carries the baby flag.
    pub fn is_ageable(self) -> bool {
        matches!(
            self,
            EntityKind::Animal | EntityKind::Ageable | EntityKind::Tameable
        )
    }

    /// Whether the kind shows equipment slots.
    pub fn has_gear(self) -> bool {
        matches!(
            self,
            EntityKind::Gear | EntityKind::Player | EntityKind::ArmorStand
        )
    }

    /// Fresh capability state for this kind.
    pub fn capabilities(self) -> Capabilities {
        Capabilities::for_kind(self)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Mob => "mob",
            EntityKind::Ambient => "ambient",
            EntityKind::Animal => "animal",
            EntityKind::Ageable => "ageable",
            EntityKind::Tameable => "tameable",
            EntityKind::Gear => "gear",
            EntityKind::Creeper => "creeper",
            EntityKind::Bat => "bat",
            EntityKind::Player => "player",
            EntityKind::ArmorStand => "armor_stand",
            EntityKind::FallingBlock => "falling_block",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        assert_eq!(EntityKind::Player.shape(), SpawnShape::Player);
        assert_eq!(EntityKind::FallingBlock.shape(), SpawnShape::Object);
        assert_eq!(EntityKind::ArmorStand.shape(), SpawnShape::Living);
        assert_eq!(EntityKind::Bat.shape(), SpawnShape::Living);
    }

    #[test]
    fn test_capabilities_follow_kind() {
        let stand = EntityKind::ArmorStand.capabilities();
        assert!(stand.health.is_none());
        assert!(stand.armor_stand.is_some());
        assert!(stand.gear.is_some());

        let wolf = EntityKind::Tameable.capabilities();
        assert!(wolf.health.is_some());
        assert!(wolf.ageable.is_some());
        assert!(wolf.tameable.is_some());
        assert!(wolf.gear.is_none());

        let player = EntityKind::Player.capabilities();
        assert!(player.player.is_some());
        assert!(player.ageable.is_none());
    }
}
