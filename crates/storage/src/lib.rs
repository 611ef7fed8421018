//! Storage layer for Structura
//!
//! This crate implements the in-memory data model:
//! - DataStore: typed, shaped element buffer with Empty / InMemory /
//!   OutOfCore backends
//! - ChunkedStore: temp-file backed store with a bounded LRU chunk cache
//! - DataArray / StringArray / NeighborList behind the `AnyArray` trait
//! - Geometry descriptors with non-owning references
//! - DataGraph: arena of DataObjects addressed by DataPath
//!
//! # Ownership
//!
//! Ownership edges are parent ids. Cross references (a geometry's vertex or
//! connectivity list) are DataIds resolved at use time, never a second owner.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod chunked;
pub mod geometry;
pub mod graph;
pub mod neighbor_list;
pub mod object;
pub mod store;
pub mod string_array;

pub use array::{AnyArray, ArrayKind, DataArray};
pub use chunked::{ChunkedStore, OutOfCoreOptions};
pub use geometry::{Geometry, GeometryKind, ImageGrid};
pub use graph::{DataGraph, ObjectSummary};
pub use neighbor_list::NeighborList;
pub use object::{DataObject, ObjectKind, ObjectType};
pub use store::{DataStore, StoreKind};
pub use string_array::StringArray;
