//! # Phantom Replication
//!
//! Per-viewer replication of client-only "phantom" entities: mobs, armor
//! stands and fake players that exist only on the clients that are shown
//! them, never in the authoritative simulation.
//!
//! ## Core Features
//!
//! - **Collision-free ids**: phantom ids never clash with host-simulated entities
//! - **Per-viewer visibility**: allow-lists, world binding and render-distance culling
//! - **Minimal updates**: only metadata fields that changed since the last broadcast are sent
//! - **Interaction routing**: clicks on phantoms are intercepted and handed to observers
//! - **Deterministic**: a single-threaded `&mut self` core, driven one tick at a time
//!
//! ## Architecture Overview
//!
//! The host supplies a [`ReplicationContext`] (packet sink, viewer directory,
//! world query) and owns a [`ReplicationCoordinator`]. Application code
//! creates entities through the coordinator and gets back
//! [`EntityHandle`]s; the coordinator keeps every viewer's view consistent
//! as the host reports viewer events.
//!
//! ## Quick Start Example
//!
//! ```rust,ignore
//! use phantom_replication::*;
//!
//! let ctx = ReplicationContext::new(sink, directory, worlds);
//! let mut coordinator = ReplicationCoordinator::new(ctx, ReplicationConfig::default())?;
//!
//! let zombie = coordinator.create(
//!     EntityKind::Mob,
//!     "zombie",
//!     Transform::new(WorldId::new("overworld"), Position::new(0.0, 64.0, 0.0)),
//! );
//! coordinator.spawn(zombie)?;
//!
//! coordinator.entity_mut(zombie)?.health_mut()?.set(10.0);
//! coordinator.update(zombie)?;
//!
//! // Once per host tick
//! coordinator.tick();
//! ```

pub mod config;
pub mod context;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod identity;
pub mod interaction;
pub mod metadata;
pub mod protocol;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use config::ReplicationConfig;
pub use context::{PacketSink, ReplicationContext, ViewerDirectory, ViewerState, WorldQuery};
pub use coordinator::{CoordinatorTask, ReplicationCoordinator};
pub use entity::{EntityKind, ReplicatedEntity};
pub use error::{ConfigValidationError, InteractionError, ReplicationError, TransportError};
pub use identity::IdentityRegistry;
pub use interaction::{
    InteractionAction, InteractionObserver, InteractionRouter, NameProvider, ObserverId,
};
pub use metadata::StateWatcher;
pub use protocol::{
    EntityStatus, EquipmentSlot, ItemStack, MetadataField, MetadataValue, NameTagVisibility,
    Packet, PlayerInfoAction, RawInteraction, SignedTexture, SpawnShape,
};
pub use scheduler::{TaskHandle, TickScheduler};
pub use stats::ReplicationStats;
pub use types::*;
pub use visibility::{VisibilityPolicy, VisibilityScope};
