//! # Core Type Definitions
//!
//! Fundamental identifiers and spatial types shared by every part of the
//! replication core.
//!
//! ## Key Types
//!
//! - [`EntityHandle`] - Generational key of an entity owned by the coordinator
//! - [`ViewerId`] - Unique identifier for a connected client
//! - [`EntityId`] - Network id of a replicated (or host-simulated) entity
//! - [`WorldId`] - Name of a loaded world
//! - [`Position`] / [`Transform`] - Where an entity or viewer is
//! - [`Rotation`] - Pose vector used by armor stands

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use uuid::Uuid;

new_key_type! {
    /// Stable handle for phantom entities backed by a generational slot map.
    ///
    /// A removed entity's slot may be reused, but its old handle never
    /// resolves to the new occupant.
    pub struct EntityHandle;
}

/// Unique identifier for a connected viewer.
///
/// Wraps a UUID so viewer ids cannot be confused with entity uuids.
///
/// ```rust
/// use phantom_replication::ViewerId;
///
/// let viewer = ViewerId::new();
/// let parsed = ViewerId::from_str(&viewer.to_string())?;
/// assert_eq!(viewer, parsed);
/// # Ok::<(), uuid::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(pub Uuid);

impl ViewerId {
    /// Creates a new random viewer ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a viewer ID from its string representation.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::str::FromStr for ViewerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network id of an entity as seen by clients.
///
/// Replicated entities and host-simulated entities share one id space, which
/// is why allocation goes through [`crate::IdentityRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of a loaded world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 3D position in world space.
///
/// Double precision keeps far-from-origin worlds accurate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (vertical axis)
    pub y: f64,
    /// Z coordinate (north-south axis)
    pub z: f64,
}

impl Position {
    /// Creates a new position with the specified coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to another position.
    pub fn distance_squared(&self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: Position) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns this position shifted by the given offsets.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The block containing this position.
    pub fn block(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Position plus orientation, optionally bound to a world.
///
/// An entity without a world binding skips the world check during
/// visibility evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// World the transform lives in, if bound
    pub world: Option<WorldId>,
    /// Position within the world
    pub position: Position,
    /// Body yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
}

impl Transform {
    /// Creates a transform bound to `world`.
    pub fn new(world: WorldId, position: Position) -> Self {
        Self {
            world: Some(world),
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Creates a transform without a world binding.
    pub fn unbound(position: Position) -> Self {
        Self {
            world: None,
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Sets yaw and pitch, returning the modified transform.
    pub fn with_rotation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }
}

/// A three-axis pose vector in radians.
///
/// Converted to degrees when written to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotation {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The same rotation expressed in degrees.
    pub fn to_degrees(self) -> [f32; 3] {
        [self.x.to_degrees(), self.y.to_degrees(), self.z.to_degrees()]
    }
}

/// A velocity impulse in blocks per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
