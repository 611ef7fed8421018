//! Error types for Structura
//!
//! Every fallible operation in the data graph, the action engine and the
//! filter layer reports a [`StructuraError`]. Each variant carries a stable
//! integer code so errors can be surfaced as `{code, message}` diagnostics.

use crate::path::DataPath;
use crate::shape::Shape;
use std::io;
use thiserror::Error;

/// Result type alias for Structura operations
pub type StructuraResult<T> = std::result::Result<T, StructuraError>;

/// Error taxonomy shared by every layer
///
/// # Categories
///
/// | Category | Variants |
/// |----------|----------|
/// | Addressing | `NotFound`, `InvalidName` |
/// | Structure | `NameConflict`, `InUse`, `CyclicMove` |
/// | Shape / type | `ShapeMismatch`, `TypeMismatch`, `IndexOutOfBounds` |
/// | Resources | `CapacityExceeded`, `Io` |
/// | Input | `InvalidParameter` |
/// | Other | `InvalidOperation`, `Internal` |
#[derive(Debug, Error)]
pub enum StructuraError {
    /// Path (or one of its parents) does not resolve
    #[error("data object not found: {path}")]
    NotFound {
        /// The path that failed to resolve
        path: DataPath,
    },

    /// Object id no longer present in the graph
    #[error("data object id {id} not found")]
    IdNotFound {
        /// The stale id
        id: u64,
    },

    /// A sibling with the same name already exists
    #[error("name conflict: '{name}' already exists under '{parent}'")]
    NameConflict {
        /// Parent that already owns the name
        parent: DataPath,
        /// Conflicting name
        name: String,
    },

    /// Name is empty or contains the path separator
    #[error("invalid object name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Tuple or component shape inconsistent with parent or request
    #[error("shape mismatch at {path}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Object whose shape was rejected
        path: DataPath,
        /// Required shape
        expected: Shape,
        /// Offered shape
        actual: Shape,
    },

    /// Downcast to the wrong element type
    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Object that was accessed
        path: DataPath,
        /// Requested type name
        expected: String,
        /// Stored type name
        actual: String,
    },

    /// Element index outside the store
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested flat index
        index: usize,
        /// Number of elements in the store
        len: usize,
    },

    /// Allocation does not fit and no capacity-constrained backend is configured
    #[error("capacity exceeded: requested {requested} bytes, {available} available")]
    CapacityExceeded {
        /// Requested bytes
        requested: u64,
        /// Bytes reported available
        available: u64,
    },

    /// Argument failed schema validation
    #[error("invalid parameter '{key}': {reason}")]
    InvalidParameter {
        /// Parameter key
        key: String,
        /// Validation failure
        reason: String,
    },

    /// Removal rejected because another object still references the target
    #[error("{path} is referenced by {referrer}")]
    InUse {
        /// Object scheduled for removal
        path: DataPath,
        /// Object holding the non-owning reference
        referrer: DataPath,
    },

    /// Moving an object under itself or one of its descendants
    #[error("cannot move {path} under its own descendant {target}")]
    CyclicMove {
        /// Object being moved
        path: DataPath,
        /// Requested new parent
        target: DataPath,
    },

    /// Operation not valid for the object kind or current state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O error from an out-of-core backend or config file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl StructuraError {
    /// Stable integer code used in diagnostics
    pub fn code(&self) -> i32 {
        match self {
            StructuraError::NotFound { .. } => -100,
            StructuraError::IdNotFound { .. } => -101,
            StructuraError::NameConflict { .. } => -200,
            StructuraError::InvalidName { .. } => -201,
            StructuraError::InUse { .. } => -202,
            StructuraError::CyclicMove { .. } => -203,
            StructuraError::ShapeMismatch { .. } => -300,
            StructuraError::TypeMismatch { .. } => -301,
            StructuraError::IndexOutOfBounds { .. } => -302,
            StructuraError::CapacityExceeded { .. } => -400,
            StructuraError::Io(_) => -401,
            StructuraError::InvalidParameter { .. } => -500,
            StructuraError::InvalidOperation(_) => -600,
            StructuraError::Internal(_) => -999,
        }
    }

    /// Build a `NotFound` error
    pub fn not_found(path: impl Into<DataPath>) -> Self {
        StructuraError::NotFound { path: path.into() }
    }

    /// Build an `InvalidParameter` error
    pub fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StructuraError::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidOperation` error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        StructuraError::InvalidOperation(msg.into())
    }

    /// Build an `Internal` error
    pub fn internal(msg: impl Into<String>) -> Self {
        StructuraError::Internal(msg.into())
    }

    /// True for the variants that mean "nothing exists there"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StructuraError::NotFound { .. } | StructuraError::IdNotFound { .. }
        )
    }
}
