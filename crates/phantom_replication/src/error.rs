//! Error types for the replication core.
//!
//! Failures are kept local: a transport error on one viewer or a failing
//! observer never aborts work for other entities or viewers.

use crate::types::EntityId;

/// Errors surfaced by entity lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// The handle refers to an entity that has been removed
    #[error("Entity handle is stale or was never issued")]
    StaleHandle,

    /// The operation needs a spawned entity to compute its viewers
    #[error("Entity {0} has never been spawned")]
    NotSpawned(EntityId),

    /// The entity's kind does not carry the requested capability
    #[error("Entity {id} has no {capability} capability")]
    CapabilityMissing {
        id: EntityId,
        capability: &'static str,
    },
}

/// Errors reported by a [`crate::PacketSink`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The viewer's connection is gone
    #[error("Viewer connection closed")]
    Disconnected,

    /// The packet could not be encoded for the wire
    #[error("Encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Any other transport-level failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised by interaction observers.
#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("Observer failed: {0}")]
    Handler(String),
}

/// Configuration validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
