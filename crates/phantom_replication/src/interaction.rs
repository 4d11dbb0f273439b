//! # Interaction Routing
//!
//! Clients report clicks on entities by network id. Phantom entities do not
//! exist in the host simulation, so those messages would otherwise be
//! dropped. The [`InteractionRouter`] maps the ids of spawned phantoms back to
//! their entity handles; the coordinator uses it to intercept matching
//! messages and fan them out to the entity's observers.
//!
//! ## Action Mapping
//!
//! | Raw type | Action |
//! |---|---|
//! | `Attack` | [`InteractionAction::Primary`] |
//! | `Interact` | [`InteractionAction::Secondary`] |
//! | `InteractAt`, unknown | none, message is still consumed |

use crate::entity::ReplicatedEntity;
use crate::error::InteractionError;
use crate::protocol::RawInteraction;
use crate::types::{EntityHandle, EntityId, ViewerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Application-level interaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionAction {
    /// Left click / attack
    Primary,
    /// Right click / use
    Secondary,
}

impl InteractionAction {
    /// Maps a raw client interaction to an action, if it carries one.
    pub fn from_raw(raw: RawInteraction) -> Option<Self> {
        match raw {
            RawInteraction::Attack => Some(InteractionAction::Primary),
            RawInteraction::Interact => Some(InteractionAction::Secondary),
            RawInteraction::InteractAt | RawInteraction::Unknown(_) => None,
        }
    }
}

/// Identifier of an observer registered on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

/// Listener notified when a viewer interacts with a phantom entity.
///
/// Observers run on the tick thread with a shared view of the entity. A
/// returned error or a panic is logged and does not affect other observers.
pub trait InteractionObserver: Send + Sync {
    fn on_interaction(
        &self,
        viewer: ViewerId,
        entity: &ReplicatedEntity,
        action: InteractionAction,
    ) -> Result<(), InteractionError>;
}

impl<F> InteractionObserver for F
where
    F: Fn(ViewerId, &ReplicatedEntity, InteractionAction) -> Result<(), InteractionError>
        + Send
        + Sync,
{
    fn on_interaction(
        &self,
        viewer: ViewerId,
        entity: &ReplicatedEntity,
        action: InteractionAction,
    ) -> Result<(), InteractionError> {
        self(viewer, entity, action)
    }
}

/// Supplies a per-viewer display name for one entity.
pub trait NameProvider: Send + Sync {
    fn name_for(&self, viewer: ViewerId) -> String;
}

impl<F> NameProvider for F
where
    F: Fn(ViewerId) -> String + Send + Sync,
{
    fn name_for(&self, viewer: ViewerId) -> String {
        self(viewer)
    }
}

/// Maps network ids of spawned phantoms to their handles.
#[derive(Debug, Default, Clone)]
pub struct InteractionRouter {
    routes: HashMap<EntityId, EntityHandle>,
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts intercepting interactions aimed at `id`.
    pub fn register(&mut self, id: EntityId, handle: EntityHandle) {
        self.routes.insert(id, handle);
    }

    /// Stops intercepting `id`; returns whether it was registered.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        self.routes.remove(&id).is_some()
    }

    pub fn resolve(&self, id: EntityId) -> Option<EntityHandle> {
        self.routes.get(&id).copied()
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.routes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_action_mapping() {
        assert_eq!(
            InteractionAction::from_raw(RawInteraction::Attack),
            Some(InteractionAction::Primary)
        );
        assert_eq!(
            InteractionAction::from_raw(RawInteraction::Interact),
            Some(InteractionAction::Secondary)
        );
        assert_eq!(InteractionAction::from_raw(RawInteraction::InteractAt), None);
        assert_eq!(InteractionAction::from_raw(RawInteraction::from(9)), None);
    }

    #[test]
    fn test_register_and_unregister() {
        let mut entities: SlotMap<EntityHandle, ()> = SlotMap::with_key();
        let handle = entities.insert(());
        let mut router = InteractionRouter::new();

        router.register(EntityId(1_000_000), handle);
        assert_eq!(router.resolve(EntityId(1_000_000)), Some(handle));
        assert!(router.unregister(EntityId(1_000_000)));
        assert!(!router.unregister(EntityId(1_000_000)));
        assert!(router.is_empty());
    }
}
