//! Object identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a data object, unique within one graph
///
/// Ids are allocated from a monotonic counter and never reused, so a stale
/// id held as a non-owning reference fails to resolve instead of silently
/// pointing at a different object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(u64);

impl DataId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
