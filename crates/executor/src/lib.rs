//! # Structura Executor
//!
//! Filters, pipelines and everything needed to run them against a
//! [`DataGraph`](structura_storage::DataGraph).
//!
//! This crate provides:
//! - [`Filter`] - The plan/run contract every processing step implements
//! - [`Parameters`]/[`Arguments`] - Declared inputs and the values bound to them
//! - [`Pipeline`] - Ordered filter execution with preflight and execute modes
//! - [`FilterRegistry`] - Filter lookup by name or UUID
//! - [`PipelineDocument`] - JSON form of a pipeline
//!
//! ## Quick Start
//!
//! ```text
//! use structura_executor::{Arguments, FilterRegistry, Pipeline, RunEnvironment};
//!
//! let registry = FilterRegistry::with_builtins();
//! let mut pipeline = Pipeline::new("setup");
//! pipeline.push_filter(
//!     registry.create("create_data_group")?,
//!     Arguments::new().with("path", DataPath::parse("Group")?),
//! );
//!
//! let env = RunEnvironment::default();
//! let (preview, report) = pipeline.preflight(&graph, &env);   // placeholders only
//! let report = pipeline.execute(&mut graph, &env);            // real data
//! ```
//!
//! ## Filter Lifecycle
//!
//! ```text
//! Idle -> Planning -> Planned -> Committing -> Running -> Completed
//!             |          |           |           |
//!             +----------+-----------+-----------+--> Faulted | Cancelled
//! ```
//!
//! Planning never mutates the graph. The plan's actions are applied by the
//! pipeline during `Committing`; `Running` only happens in execute mode.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod document;
mod filter;
pub mod filters;
mod message;
mod parameters;
mod pipeline;
mod registry;
mod state;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use cache::{RunCache, ScopedCache};
pub use document::{NodeDocument, PipelineDocument};
pub use filter::{ExecutionContext, Filter, FilterId, PlanOutcome, PreviewValue};
pub use message::{CollectingHandler, Message, MessageHandler, MessageKind, TracingHandler};
pub use parameters::{Arguments, Parameter, ParameterKind, ParameterValue, Parameters, UNKNOWN_ARGUMENT};
pub use pipeline::{
    NodeReport, NoopObserver, Pipeline, PipelineNode, PipelineObserver, PipelineReport, RunEnvironment,
};
pub use registry::{FilterFactory, FilterRegistry};
pub use state::FilterState;
