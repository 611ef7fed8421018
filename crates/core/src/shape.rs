//! Tuple and component shapes

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Ordered dimension sizes, slowest-varying first
///
/// Used both for tuple shapes (e.g. `[z, y, x]` for an image's cell data)
/// and component shapes (e.g. `[3]` for a vector per tuple).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(SmallVec<[usize; 4]>);

impl Shape {
    /// Shape with a single dimension
    pub fn scalar(len: usize) -> Self {
        Shape(SmallVec::from_slice(&[len]))
    }

    /// Dimension sizes
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of all dimensions; 1 for a rank-0 shape
    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Overflow-checked element count
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(SmallVec::from_vec(dims))
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(SmallVec::from_slice(dims))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape(dims.iter().copied().collect())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}
