//! Filter lifecycle
//!
//! ```text
//! Idle ─► Planning ─► Planned ─► Committing ─► Running ─► Completed
//!              │          │           │  │          │
//!              └──────────┴───────────┴──┴──────────┴──► Faulted / Cancelled
//! ```
//!
//! `Committing` may finish directly in `Completed` (preflight, or a filter
//! with nothing to run). `Planned` cannot fault because nothing happens in
//! it. Every terminal state may return to `Idle` for the next run.

use serde::{Deserialize, Serialize};
use std::fmt;
use structura_core::{StructuraError, StructuraResult};

/// Lifecycle state of one filter invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterState {
    /// Not started
    #[default]
    Idle,
    /// Validating arguments and building the action plan
    Planning,
    /// Plan built without errors
    Planned,
    /// Applying the plan to the graph
    Committing,
    /// Running the filter's kernel
    Running,
    /// Finished successfully
    Completed,
    /// Finished with errors
    Faulted,
    /// Stopped by cancellation
    Cancelled,
}

impl FilterState {
    /// True for `Completed`, `Faulted` and `Cancelled`
    pub fn is_terminal(self) -> bool {
        matches!(self, FilterState::Completed | FilterState::Faulted | FilterState::Cancelled)
    }

    /// Whether moving to `next` is legal
    pub fn can_transition_to(self, next: FilterState) -> bool {
        use FilterState::*;
        match (self, next) {
            (Idle, Planning) => true,
            (Planning, Planned | Faulted | Cancelled) => true,
            (Planned, Committing | Cancelled) => true,
            (Committing, Running | Completed | Faulted | Cancelled) => true,
            (Running, Completed | Faulted | Cancelled) => true,
            (Completed | Faulted | Cancelled, Idle) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: FilterState) -> StructuraResult<()> {
        if !self.can_transition_to(next) {
            return Err(StructuraError::invalid_operation(format!(
                "filter state cannot go from {} to {}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
