//! # Visibility Policy
//!
//! Decides whether a viewer should currently be rendering an entity. The
//! decision combines three checks, in order:
//!
//! 1. **Scope** - an explicit, non-empty allow-list must contain the viewer
//! 2. **World** - a world-bound entity is only seen from the same world
//! 3. **Distance** - the viewer must be within render distance
//!
//! Adding and removing share one boundary: a viewer is added when
//! `distance <= render_distance` and removed when `distance > render_distance`,
//! so a viewer standing exactly on the boundary stays where it is.

use crate::context::ViewerState;
use crate::types::{Transform, ViewerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which viewers an entity may be shown to at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibilityScope {
    /// Every viewer, subject to world and distance
    #[default]
    Global,
    /// Only the listed viewers; an empty list behaves as [`VisibilityScope::Global`]
    Explicit(HashSet<ViewerId>),
}

impl VisibilityScope {
    /// Whether the scope admits `viewer`.
    pub fn allows(&self, viewer: ViewerId) -> bool {
        match self {
            VisibilityScope::Global => true,
            VisibilityScope::Explicit(allowed) => allowed.is_empty() || allowed.contains(&viewer),
        }
    }

    /// Adds `viewer` to the allow-list, switching a global scope to explicit.
    pub fn insert(&mut self, viewer: ViewerId) {
        match self {
            VisibilityScope::Global => {
                *self = VisibilityScope::Explicit(HashSet::from([viewer]));
            }
            VisibilityScope::Explicit(allowed) => {
                allowed.insert(viewer);
            }
        }
    }

    /// Removes `viewer` from the allow-list.
    ///
    /// Removing the last member leaves an empty list, which admits everyone.
    pub fn remove(&mut self, viewer: ViewerId) -> bool {
        match self {
            VisibilityScope::Global => false,
            VisibilityScope::Explicit(allowed) => allowed.remove(&viewer),
        }
    }

    pub fn is_global(&self) -> bool {
        match self {
            VisibilityScope::Global => true,
            VisibilityScope::Explicit(allowed) => allowed.is_empty(),
        }
    }
}

/// World and render-distance predicate shared by every reconciliation path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityPolicy {
    render_distance_squared: f64,
}

impl VisibilityPolicy {
    pub fn new(render_distance: f64) -> Self {
        Self {
            render_distance_squared: render_distance * render_distance,
        }
    }

    /// Full eligibility check for an entity's scope and transform.
    pub fn eligible(
        &self,
        scope: &VisibilityScope,
        transform: &Transform,
        viewer: &ViewerState,
    ) -> bool {
        scope.allows(viewer.id) && self.same_world(transform, viewer) && self.in_range(transform, viewer)
    }

    /// Whether the viewer's world matches the entity's bound world.
    pub fn same_world(&self, transform: &Transform, viewer: &ViewerState) -> bool {
        match &transform.world {
            Some(world) => viewer.transform.world.as_ref() == Some(world),
            None => true,
        }
    }

    /// Whether the viewer is within render distance, boundary inclusive.
    pub fn in_range(&self, transform: &Transform, viewer: &ViewerState) -> bool {
        transform
            .position
            .distance_squared(viewer.transform.position)
            <= self.render_distance_squared
    }
}
