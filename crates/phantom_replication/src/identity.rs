//! Entity id allocation.
//!
//! Phantom entities share the client's entity id space with entities the
//! host actually simulates, so a candidate id is only handed out once no
//! live phantom holds it and no loaded world contains a simulated entity
//! with it.

use crate::context::WorldQuery;
use crate::types::EntityId;
use std::collections::HashSet;
use tracing::trace;

/// Allocates globally unique entity ids above a reserved floor.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    floor: i32,
    next: i32,
    live: HashSet<EntityId>,
}

impl IdentityRegistry {
    /// Creates a registry that starts probing at `floor`.
    pub fn new(floor: i32) -> Self {
        Self {
            floor,
            next: floor,
            live: HashSet::new(),
        }
    }

    /// Allocates the next free id.
    ///
    /// Probing costs O(entities × worlds) per candidate in the worst case,
    /// which is fine given how rarely phantoms are created.
    pub fn next_id(&mut self, worlds: &dyn WorldQuery) -> EntityId {
        let loaded = worlds.loaded_worlds();
        loop {
            let candidate = EntityId(self.next);
            self.next = if self.next == i32::MAX {
                self.floor
            } else {
                self.next + 1
            };

            if self.live.contains(&candidate) {
                continue;
            }
            if loaded.iter().any(|world| worlds.has_entity(world, candidate)) {
                trace!("Entity id {} is held by a simulated entity, probing on", candidate);
                continue;
            }

            self.live.insert(candidate);
            return candidate;
        }
    }

    /// Returns an id to the pool once its entity has been removed.
    pub fn release(&mut self, id: EntityId) -> bool {
        self.live.remove(&id)
    }

    /// Number of ids currently held by phantoms.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
