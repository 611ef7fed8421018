//! Diagnostics returned by every fallible entry point
//!
//! An [`Outcome`] is either a value or a non-empty list of error
//! [`Diagnostic`]s, plus a list of warnings that never abort the operation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StructuraError;

/// A `{code, message}` pair, used for both errors and warnings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable integer code (negative for errors by convention)
    pub code: i32,
    /// Human readable message
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<StructuraError> for Diagnostic {
    fn from(e: StructuraError) -> Self {
        Diagnostic::new(e.code(), e.to_string())
    }
}

impl From<&StructuraError> for Diagnostic {
    fn from(e: &StructuraError) -> Self {
        Diagnostic::new(e.code(), e.to_string())
    }
}

/// Aggregate severity of a node or pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultState {
    /// Neither warnings nor errors
    #[default]
    None,
    /// Warnings only
    Warnings,
    /// At least one error
    Errors,
}

impl FaultState {
    /// Derive the state from diagnostic counts
    pub fn from_counts(errors: usize, warnings: usize) -> Self {
        if errors > 0 {
            FaultState::Errors
        } else if warnings > 0 {
            FaultState::Warnings
        } else {
            FaultState::None
        }
    }

    /// The more severe of two states
    pub fn worst(self, other: FaultState) -> FaultState {
        self.max(other)
    }
}

/// Value-or-errors plus warnings
#[derive(Debug)]
pub struct Outcome<T> {
    /// The value, or every error that prevented it
    pub result: Result<T, Vec<Diagnostic>>,
    /// Non-fatal diagnostics
    pub warnings: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    /// Successful outcome without warnings
    pub fn ok(value: T) -> Self {
        Self {
            result: Ok(value),
            warnings: Vec::new(),
        }
    }

    /// Failed outcome with a single error
    pub fn error(diagnostic: impl Into<Diagnostic>) -> Self {
        Self {
            result: Err(vec![diagnostic.into()]),
            warnings: Vec::new(),
        }
    }

    /// Failed outcome with several errors
    ///
    /// An empty list is still treated as a failure.
    pub fn errors(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            result: Err(diagnostics),
            warnings: Vec::new(),
        }
    }

    /// Attach warnings
    pub fn with_warnings(mut self, warnings: Vec<Diagnostic>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Add a single warning
    pub fn push_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }

    /// True if there is a value
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Error diagnostics, empty on success
    pub fn error_list(&self) -> &[Diagnostic] {
        match &self.result {
            Ok(_) => &[],
            Err(errors) => errors,
        }
    }

    /// Severity of this outcome
    pub fn fault_state(&self) -> FaultState {
        match &self.result {
            Err(_) => FaultState::Errors,
            Ok(_) => FaultState::from_counts(0, self.warnings.len()),
        }
    }

    /// Transform the value, keeping warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            result: self.result.map(f),
            warnings: self.warnings,
        }
    }

    /// Split into `(result, warnings)`
    pub fn into_parts(self) -> (Result<T, Vec<Diagnostic>>, Vec<Diagnostic>) {
        (self.result, self.warnings)
    }
}

impl<T> From<Result<T, StructuraError>> for Outcome<T> {
    fn from(result: Result<T, StructuraError>) -> Self {
        match result {
            Ok(value) => Outcome::ok(value),
            Err(e) => Outcome::error(e),
        }
    }
}
