//! Core types for Structura
//!
//! This crate defines the foundational types used throughout the system:
//! - DataPath: hierarchical address of an object in the data graph
//! - DataId: never-reused object identity
//! - Shape: tuple and component shapes
//! - DataType / Element: closed set of primitive element types and the
//!   `dispatch_data_type!` bridge from runtime tag to generic code
//! - StructuraError: error taxonomy with stable integer codes
//! - Diagnostic / Outcome / FaultState: `{code, message}` reporting

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data_type;
pub mod diagnostics;
pub mod error;
pub mod id;
pub mod path;
pub mod shape;

pub use data_type::{DataType, Element};
pub use diagnostics::{Diagnostic, FaultState, Outcome};
pub use error::{StructuraError, StructuraResult};
pub use id::DataId;
pub use path::{validate_name, DataPath, PATH_SEPARATOR};
pub use shape::Shape;
