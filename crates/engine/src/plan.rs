//! Ordered action lists
//!
//! A plan holds primary actions and deferred actions. Primary actions are
//! applied in list order; deferred actions only run once every primary
//! action succeeded, so a filter can create its output before deleting its
//! input.

use serde::{Deserialize, Serialize};
use structura_core::StructuraResult;
use structura_storage::DataGraph;
use tracing::{debug, warn};

use crate::action::{Action, ActionMode};
use crate::allocator::StorageAllocator;

/// Primary and deferred actions of one filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Applied first, in order
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Applied after every primary action, in order
    #[serde(default)]
    pub deferred: Vec<Action>,
}

impl ActionPlan {
    /// Empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary action
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Add a deferred action
    pub fn push_deferred(&mut self, action: Action) {
        self.deferred.push(action);
    }

    /// Append another plan's primary and deferred actions after this one's
    pub fn append(&mut self, other: ActionPlan) {
        self.actions.extend(other.actions);
        self.deferred.extend(other.deferred);
    }

    /// Total action count
    pub fn len(&self) -> usize {
        self.actions.len() + self.deferred.len()
    }

    /// True if there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every action in application order
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().chain(self.deferred.iter())
    }

    /// Apply every action to `graph`, stopping at the first failure
    ///
    /// Actions applied before the failing one stay applied.
    pub fn apply(&self, graph: &mut DataGraph, mode: ActionMode, allocator: &StorageAllocator) -> StructuraResult<()> {
        debug!(
            target: "structura::action",
            %mode,
            actions = self.actions.len(),
            deferred = self.deferred.len(),
            "Applying plan"
        );
        for action in self.iter() {
            if let Err(e) = action.apply(graph, mode, allocator) {
                warn!(target: "structura::action", %mode, action = %action.description(), error = %e, "Action failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl From<Vec<Action>> for ActionPlan {
    fn from(actions: Vec<Action>) -> Self {
        Self {
            actions,
            deferred: Vec::new(),
        }
    }
}
