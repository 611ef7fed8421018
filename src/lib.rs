//! Structura - typed hierarchical datasets mutated through filter pipelines
//!
//! Structura keeps a scientific dataset as a graph of groups, attribute
//! matrices, geometries and typed arrays, and changes it only through
//! filters that first describe their changes and then commit them.
//!
//! # Quick Start
//!
//! ```ignore
//! use structura::{Arguments, DataGraph, DataPath, FilterRegistry, Pipeline, RunEnvironment, Shape};
//!
//! let registry = FilterRegistry::with_builtins();
//! let mut pipeline = Pipeline::new("setup");
//! pipeline
//!     .push_filter(registry.create("create_data_group")?, Arguments::new().with("path", DataPath::parse("G")?))
//!     .push_filter(
//!         registry.create("create_attribute_matrix")?,
//!         Arguments::new()
//!             .with("path", DataPath::parse("G/AM")?)
//!             .with("tuple_shape", Shape::from([10])),
//!     );
//!
//! let mut graph = DataGraph::new();
//! let report = pipeline.execute(&mut graph, &RunEnvironment::default());
//! assert!(report.is_ok());
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate |
//! |-------|-------|
//! | paths, element types, errors | `structura-core` |
//! | value stores, arrays, data graph | `structura-storage` |
//! | parallel range, task runner | `structura-concurrency` |
//! | actions, allocation, preferences | `structura-engine` |
//! | filters, pipelines | `structura-executor` |
//!
//! The executor API is re-exported at the top level, along with the types
//! needed to build and inspect a graph.

pub use structura_executor::*;

pub use structura_concurrency::{CancellationToken, ParallelConfig, ParallelRange};
pub use structura_core::{
    DataId, DataPath, DataType, Diagnostic, Element, FaultState, Outcome, Shape, StructuraError, StructuraResult,
};
pub use structura_engine::{Action, ActionMode, ActionPlan, Preferences, StorageAllocator, CONFIG_FILE_NAME};
pub use structura_storage::{AnyArray, DataArray, DataGraph, DataStore, ObjectType, OutOfCoreOptions, StoreKind};
