//! Value stores
//!
//! A [`DataStore`] is the typed, shaped element buffer behind one array:
//! `num_tuples × num_components` elements of one primitive type. Its backend
//! is swappable:
//!
//! | Backend | Holds data | Used for |
//! |---------|------------|----------|
//! | `Empty` | no | preflight placeholders carrying only shape/type |
//! | `InMemory` | `Vec<T>` | default resident storage |
//! | `OutOfCore` | [`ChunkedStore`] | arrays above the capacity threshold |

use serde::{Deserialize, Serialize};
use std::fmt;
use structura_core::{DataType, Element, Shape, StructuraError, StructuraResult};

use crate::chunked::{ChunkedStore, OutOfCoreOptions};

/// Backend discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Placeholder without element data
    Empty,
    /// Resident vector
    InMemory,
    /// File-backed chunked storage
    OutOfCore,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Empty => write!(f, "empty"),
            StoreKind::InMemory => write!(f, "in-memory"),
            StoreKind::OutOfCore => write!(f, "out-of-core"),
        }
    }
}

enum Backend<T: Element> {
    Empty,
    InMemory(Vec<T>),
    OutOfCore(ChunkedStore<T>),
}

/// Typed, shape-aware element buffer
pub struct DataStore<T: Element> {
    tuple_shape: Shape,
    component_shape: Shape,
    backend: Backend<T>,
}

impl<T: Element> fmt::Debug for DataStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("data_type", &T::DATA_TYPE)
            .field("tuple_shape", &self.tuple_shape)
            .field("component_shape", &self.component_shape)
            .field("kind", &self.kind())
            .finish()
    }
}

fn placeholder_error(tuple_shape: &Shape, component_shape: &Shape) -> StructuraError {
    StructuraError::invalid_operation(format!(
        "placeholder store {} x {} holds no element data",
        tuple_shape, component_shape
    ))
}

fn element_count(tuple_shape: &Shape, component_shape: &Shape) -> StructuraResult<usize> {
    tuple_shape
        .checked_num_elements()
        .and_then(|t| component_shape.checked_num_elements().and_then(|c| t.checked_mul(c)))
        .ok_or_else(|| {
            StructuraError::invalid_operation(format!(
                "element count of {} x {} overflows",
                tuple_shape, component_shape
            ))
        })
}

impl<T: Element> DataStore<T> {
    /// Placeholder carrying only shape and type metadata
    pub fn empty(tuple_shape: Shape, component_shape: Shape) -> Self {
        Self {
            tuple_shape,
            component_shape,
            backend: Backend::Empty,
        }
    }

    /// Zero-initialized resident store
    pub fn in_memory(tuple_shape: Shape, component_shape: Shape) -> StructuraResult<Self> {
        let len = element_count(&tuple_shape, &component_shape)?;
        Ok(Self {
            tuple_shape,
            component_shape,
            backend: Backend::InMemory(vec![T::default(); len]),
        })
    }

    /// Resident store over existing values; `values.len()` must match the shapes
    pub fn from_vec(
        tuple_shape: Shape,
        component_shape: Shape,
        values: Vec<T>,
    ) -> StructuraResult<Self> {
        let len = element_count(&tuple_shape, &component_shape)?;
        if values.len() != len {
            return Err(StructuraError::invalid_operation(format!(
                "{} values supplied for shape {} x {} ({} elements)",
                values.len(),
                tuple_shape,
                component_shape,
                len
            )));
        }
        Ok(Self {
            tuple_shape,
            component_shape,
            backend: Backend::InMemory(values),
        })
    }

    /// Zero-initialized file-backed store
    pub fn out_of_core(
        tuple_shape: Shape,
        component_shape: Shape,
        options: &OutOfCoreOptions,
    ) -> StructuraResult<Self> {
        let len = element_count(&tuple_shape, &component_shape)?;
        Ok(Self {
            tuple_shape,
            component_shape,
            backend: Backend::OutOfCore(ChunkedStore::new(len, options)?),
        })
    }

    /// Allocate a store of the requested kind
    pub fn allocate(
        kind: StoreKind,
        tuple_shape: Shape,
        component_shape: Shape,
        options: &OutOfCoreOptions,
    ) -> StructuraResult<Self> {
        match kind {
            StoreKind::Empty => Ok(Self::empty(tuple_shape, component_shape)),
            StoreKind::InMemory => Self::in_memory(tuple_shape, component_shape),
            StoreKind::OutOfCore => Self::out_of_core(tuple_shape, component_shape, options),
        }
    }

    /// Element type tag
    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Backend discriminator
    pub fn kind(&self) -> StoreKind {
        match self.backend {
            Backend::Empty => StoreKind::Empty,
            Backend::InMemory(_) => StoreKind::InMemory,
            Backend::OutOfCore(_) => StoreKind::OutOfCore,
        }
    }

    /// True unless this is a placeholder
    pub fn is_allocated(&self) -> bool {
        !matches!(self.backend, Backend::Empty)
    }

    /// Tuple shape
    pub fn tuple_shape(&self) -> &Shape {
        &self.tuple_shape
    }

    /// Component shape
    pub fn component_shape(&self) -> &Shape {
        &self.component_shape
    }

    /// Number of tuples
    pub fn num_tuples(&self) -> usize {
        self.tuple_shape.num_elements()
    }

    /// Components per tuple
    pub fn num_components(&self) -> usize {
        self.component_shape.num_elements()
    }

    /// Logical element count (also for placeholders)
    pub fn len(&self) -> usize {
        self.num_tuples() * self.num_components()
    }

    /// True when the logical element count is zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the data occupies once allocated
    pub fn size_in_bytes(&self) -> u64 {
        (self.len() * T::DATA_TYPE.size_of()) as u64
    }

    /// Read the element at flat `index`
    pub fn get(&self, index: usize) -> StructuraResult<T> {
        match &self.backend {
            Backend::Empty => Err(placeholder_error(&self.tuple_shape, &self.component_shape)),
            Backend::InMemory(values) => {
                values
                    .get(index)
                    .copied()
                    .ok_or(StructuraError::IndexOutOfBounds {
                        index,
                        len: values.len(),
                    })
            }
            Backend::OutOfCore(chunked) => chunked.get(index),
        }
    }

    /// Write the element at flat `index`
    pub fn set(&mut self, index: usize, value: T) -> StructuraResult<()> {
        match &mut self.backend {
            Backend::Empty => Err(placeholder_error(&self.tuple_shape, &self.component_shape)),
            Backend::InMemory(values) => {
                let len = values.len();
                let slot = values
                    .get_mut(index)
                    .ok_or(StructuraError::IndexOutOfBounds { index, len })?;
                *slot = value;
                Ok(())
            }
            Backend::OutOfCore(chunked) => chunked.set(index, value),
        }
    }

    /// Read one component of one tuple
    pub fn get_component(&self, tuple: usize, component: usize) -> StructuraResult<T> {
        let width = self.num_components();
        if component >= width {
            return Err(StructuraError::IndexOutOfBounds {
                index: component,
                len: width,
            });
        }
        self.get(tuple * width + component)
    }

    /// Write one component of one tuple
    pub fn set_component(&mut self, tuple: usize, component: usize, value: T) -> StructuraResult<()> {
        let width = self.num_components();
        if component >= width {
            return Err(StructuraError::IndexOutOfBounds {
                index: component,
                len: width,
            });
        }
        self.set(tuple * width + component, value)
    }

    /// Set every element
    pub fn fill(&mut self, value: T) -> StructuraResult<()> {
        match &mut self.backend {
            Backend::Empty => Err(placeholder_error(&self.tuple_shape, &self.component_shape)),
            Backend::InMemory(values) => {
                values.fill(value);
                Ok(())
            }
            Backend::OutOfCore(chunked) => chunked.fill(value),
        }
    }

    /// Contiguous view, only for the in-memory backend
    pub fn as_slice(&self) -> Option<&[T]> {
        match &self.backend {
            Backend::InMemory(values) => Some(values),
            _ => None,
        }
    }

    /// Contiguous mutable view, only for the in-memory backend
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        match &mut self.backend {
            Backend::InMemory(values) => Some(values),
            _ => None,
        }
    }

    /// Copy every element out
    pub fn to_vec(&self) -> StructuraResult<Vec<T>> {
        match &self.backend {
            Backend::Empty => Err(placeholder_error(&self.tuple_shape, &self.component_shape)),
            Backend::InMemory(values) => Ok(values.clone()),
            Backend::OutOfCore(chunked) => chunked.to_vec(),
        }
    }

    /// Change the tuple shape, keeping elements up to the overlap
    ///
    /// New elements are zero. The component shape never changes here.
    pub fn resize_tuples(&mut self, tuple_shape: Shape) -> StructuraResult<()> {
        let new_len = element_count(&tuple_shape, &self.component_shape)?;
        match &mut self.backend {
            Backend::Empty => {}
            Backend::InMemory(values) => values.resize(new_len, T::default()),
            Backend::OutOfCore(chunked) => {
                let resized = chunked.resized(new_len)?;
                *chunked = resized;
            }
        }
        self.tuple_shape = tuple_shape;
        Ok(())
    }

    /// Copy with a new tuple shape, leaving `self` untouched
    pub fn resized(&self, tuple_shape: Shape) -> StructuraResult<Self> {
        let new_len = element_count(&tuple_shape, &self.component_shape)?;
        let backend = match &self.backend {
            Backend::Empty => Backend::Empty,
            Backend::InMemory(values) => {
                let mut out = Vec::with_capacity(new_len);
                out.extend_from_slice(&values[..values.len().min(new_len)]);
                out.resize(new_len, T::default());
                Backend::InMemory(out)
            }
            Backend::OutOfCore(chunked) => Backend::OutOfCore(chunked.resized(new_len)?),
        };
        Ok(Self {
            tuple_shape,
            component_shape: self.component_shape.clone(),
            backend,
        })
    }

    /// Placeholder with the same shape and type
    pub fn placeholder(&self) -> Self {
        Self::empty(self.tuple_shape.clone(), self.component_shape.clone())
    }

    /// Deep copy, keeping the backend kind
    pub fn try_clone(&self) -> StructuraResult<Self> {
        let backend = match &self.backend {
            Backend::Empty => Backend::Empty,
            Backend::InMemory(values) => Backend::InMemory(values.clone()),
            Backend::OutOfCore(chunked) => Backend::OutOfCore(chunked.try_clone()?),
        };
        Ok(Self {
            tuple_shape: self.tuple_shape.clone(),
            component_shape: self.component_shape.clone(),
            backend,
        })
    }

    /// Copy elements from `source` (same shapes required) into this store
    pub fn copy_from(&mut self, source: &DataStore<T>) -> StructuraResult<()> {
        if source.len() != self.len() {
            return Err(StructuraError::invalid_operation(format!(
                "cannot copy {} elements into a store of {}",
                source.len(),
                self.len()
            )));
        }
        if let (Some(dst), Some(src)) = (self.as_mut_slice(), source.as_slice()) {
            dst.copy_from_slice(src);
            return Ok(());
        }
        for index in 0..source.len() {
            self.set(index, source.get(index)?)?;
        }
        Ok(())
    }
}
