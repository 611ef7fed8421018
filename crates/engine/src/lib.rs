//! Plan/commit engine for Structura
//!
//! This crate turns structural intent into graph mutations:
//! - Action: one serializable mutation, applied in preflight or execute mode
//! - ActionPlan: primary actions followed by deferred actions
//! - StorageAllocator: picks the backend for each new array from the
//!   capacity threshold and the memory probe
//! - Preferences: `structura.toml` settings for parallelism and storage
//!
//! Preflight mode never allocates element data, so the same plan validates a
//! pipeline cheaply and later commits it for real.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod allocator;
pub mod config;
pub mod plan;

pub use action::{Action, ActionMode, GeometrySpec};
pub use allocator::{
    placeholder_array, request_bytes, FixedMemoryProbe, MemoryProbe, StorageAllocator, SystemMemoryProbe,
};
pub use config::{Preferences, CONFIG_FILE_NAME};
pub use plan::ActionPlan;
