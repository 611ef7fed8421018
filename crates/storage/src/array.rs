//! Typed arrays behind a non-generic interface
//!
//! Every array object in the graph is stored as `Box<dyn AnyArray>`. The
//! trait exposes shape, element type and structural operations; the concrete
//! element type is only reachable through the checked downcasts on
//! `dyn AnyArray`.

use std::any::Any;
use std::fmt;
use structura_core::{DataType, Element, Shape, StructuraError, StructuraResult};

use crate::store::{DataStore, StoreKind};

/// Flavor of an array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// Fixed-width numeric array ([`DataArray`])
    Data,
    /// Variable-length list per tuple ([`NeighborList`](crate::NeighborList))
    NeighborList,
    /// One string per tuple ([`StringArray`](crate::StringArray))
    String,
}

/// Uniform interface over every array flavor and element type
pub trait AnyArray: Send + Sync + fmt::Debug {
    /// Flavor of this array
    fn array_kind(&self) -> ArrayKind;

    /// Element type; `None` for string arrays
    fn data_type(&self) -> Option<DataType>;

    /// Tuple shape
    fn tuple_shape(&self) -> &Shape;

    /// Component shape
    fn component_shape(&self) -> &Shape;

    /// Backend currently holding the data
    fn store_kind(&self) -> StoreKind;

    /// Change the tuple shape, preserving elements up to the overlap
    fn resize_tuples(&mut self, tuple_shape: Shape) -> StructuraResult<()>;

    /// Resized copy; `self` is untouched, even on failure
    fn resized_boxed(&self, tuple_shape: Shape) -> StructuraResult<Box<dyn AnyArray>>;

    /// Deep copy
    fn try_clone_boxed(&self) -> StructuraResult<Box<dyn AnyArray>>;

    /// Same metadata, no element data
    fn placeholder_boxed(&self) -> Box<dyn AnyArray>;

    /// Overwrite this array's elements with those of `source`
    ///
    /// `source` must have the same concrete type and element count.
    fn copy_data_from(&mut self, source: &dyn AnyArray) -> StructuraResult<()>;

    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Upcast for mutable downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of tuples
    fn num_tuples(&self) -> usize {
        self.tuple_shape().num_elements()
    }

    /// Components per tuple
    fn num_components(&self) -> usize {
        self.component_shape().num_elements()
    }
}

impl<'a> dyn AnyArray + 'a {
    /// Concrete view if the array is an `A`
    pub fn downcast_ref<A: AnyArray + 'static>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }

    /// Mutable concrete view if the array is an `A`
    pub fn downcast_mut<A: AnyArray + 'static>(&mut self) -> Option<&mut A> {
        self.as_any_mut().downcast_mut::<A>()
    }

    /// Human readable type name, used in `TypeMismatch` errors
    pub fn type_name(&self) -> String {
        match (self.array_kind(), self.data_type()) {
            (ArrayKind::Data, Some(t)) => t.to_string(),
            (ArrayKind::NeighborList, Some(t)) => format!("neighborlist<{}>", t),
            _ => "string".to_string(),
        }
    }
}

pub(crate) fn copy_type_error(target: &dyn AnyArray, source: &dyn AnyArray) -> StructuraError {
    StructuraError::invalid_operation(format!(
        "cannot copy {} data into a {} array",
        source.type_name(),
        target.type_name()
    ))
}

pub(crate) fn copy_len_error(target: usize, source: usize) -> StructuraError {
    StructuraError::invalid_operation(format!(
        "cannot copy {} tuples into an array of {}",
        source, target
    ))
}

/// Fixed-width numeric array
#[derive(Debug)]
pub struct DataArray<T: Element> {
    store: DataStore<T>,
}

impl<T: Element> DataArray<T> {
    /// Wrap a store
    pub fn new(store: DataStore<T>) -> Self {
        Self { store }
    }

    /// Backing store
    pub fn store(&self) -> &DataStore<T> {
        &self.store
    }

    /// Mutable backing store
    pub fn store_mut(&mut self) -> &mut DataStore<T> {
        &mut self.store
    }

    /// Swap in a new store; shapes may differ
    pub fn replace_store(&mut self, store: DataStore<T>) -> DataStore<T> {
        std::mem::replace(&mut self.store, store)
    }

    /// Read element at flat index
    pub fn get(&self, index: usize) -> StructuraResult<T> {
        self.store.get(index)
    }

    /// Write element at flat index
    pub fn set(&mut self, index: usize, value: T) -> StructuraResult<()> {
        self.store.set(index, value)
    }

    /// Logical element count
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if there are no elements
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<T: Element> AnyArray for DataArray<T> {
    fn array_kind(&self) -> ArrayKind {
        ArrayKind::Data
    }

    fn data_type(&self) -> Option<DataType> {
        Some(T::DATA_TYPE)
    }

    fn tuple_shape(&self) -> &Shape {
        self.store.tuple_shape()
    }

    fn component_shape(&self) -> &Shape {
        self.store.component_shape()
    }

    fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    fn resize_tuples(&mut self, tuple_shape: Shape) -> StructuraResult<()> {
        self.store.resize_tuples(tuple_shape)
    }

    fn resized_boxed(&self, tuple_shape: Shape) -> StructuraResult<Box<dyn AnyArray>> {
        Ok(Box::new(DataArray::new(self.store.resized(tuple_shape)?)))
    }

    fn try_clone_boxed(&self) -> StructuraResult<Box<dyn AnyArray>> {
        Ok(Box::new(DataArray::new(self.store.try_clone()?)))
    }

    fn placeholder_boxed(&self) -> Box<dyn AnyArray> {
        Box::new(DataArray::new(self.store.placeholder()))
    }

    fn copy_data_from(&mut self, source: &dyn AnyArray) -> StructuraResult<()> {
        let source = source
            .downcast_ref::<DataArray<T>>()
            .ok_or_else(|| copy_type_error(&*self, source))?;
        self.store.copy_from(source.store())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
