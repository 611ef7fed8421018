//! Variable-length lists, one per tuple

use std::any::Any;
use structura_core::{DataType, Element, Shape, StructuraError, StructuraResult};

use crate::array::{copy_len_error, copy_type_error, AnyArray, ArrayKind};
use crate::store::StoreKind;

/// One growable list of `T` per tuple
#[derive(Debug, Clone)]
pub struct NeighborList<T: Element> {
    tuple_shape: Shape,
    component_shape: Shape,
    lists: Option<Vec<Vec<T>>>,
}

impl<T: Element> NeighborList<T> {
    /// Every list empty
    pub fn new(tuple_shape: Shape) -> Self {
        let len = tuple_shape.num_elements();
        Self {
            tuple_shape,
            component_shape: Shape::scalar(1),
            lists: Some(vec![Vec::new(); len]),
        }
    }

    /// Placeholder without lists
    pub fn placeholder(tuple_shape: Shape) -> Self {
        Self {
            tuple_shape,
            component_shape: Shape::scalar(1),
            lists: None,
        }
    }

    fn lists_mut(&mut self) -> StructuraResult<&mut Vec<Vec<T>>> {
        self.lists
            .as_mut()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder neighbor list holds no data"))
    }

    /// List of tuple `index`
    pub fn list(&self, index: usize) -> StructuraResult<&[T]> {
        let lists = self
            .lists
            .as_ref()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder neighbor list holds no data"))?;
        lists
            .get(index)
            .map(Vec::as_slice)
            .ok_or(StructuraError::IndexOutOfBounds {
                index,
                len: lists.len(),
            })
    }

    /// Replace the list of tuple `index`
    pub fn set_list(&mut self, index: usize, values: Vec<T>) -> StructuraResult<()> {
        let lists = self.lists_mut()?;
        let len = lists.len();
        let slot = lists
            .get_mut(index)
            .ok_or(StructuraError::IndexOutOfBounds { index, len })?;
        *slot = values;
        Ok(())
    }

    /// Append to the list of tuple `index`
    pub fn push(&mut self, index: usize, value: T) -> StructuraResult<()> {
        let lists = self.lists_mut()?;
        let len = lists.len();
        lists
            .get_mut(index)
            .ok_or(StructuraError::IndexOutOfBounds { index, len })?
            .push(value);
        Ok(())
    }

    /// Total number of values across every list
    pub fn total_len(&self) -> usize {
        self.lists
            .as_ref()
            .map(|lists| lists.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl<T: Element> AnyArray for NeighborList<T> {
    fn array_kind(&self) -> ArrayKind {
        ArrayKind::NeighborList
    }

    fn data_type(&self) -> Option<DataType> {
        Some(T::DATA_TYPE)
    }

    fn tuple_shape(&self) -> &Shape {
        &self.tuple_shape
    }

    fn component_shape(&self) -> &Shape {
        &self.component_shape
    }

    fn store_kind(&self) -> StoreKind {
        if self.lists.is_some() {
            StoreKind::InMemory
        } else {
            StoreKind::Empty
        }
    }

    fn resize_tuples(&mut self, tuple_shape: Shape) -> StructuraResult<()> {
        if let Some(lists) = self.lists.as_mut() {
            lists.resize(tuple_shape.num_elements(), Vec::new());
        }
        self.tuple_shape = tuple_shape;
        Ok(())
    }

    fn resized_boxed(&self, tuple_shape: Shape) -> StructuraResult<Box<dyn AnyArray>> {
        let mut out = self.clone();
        out.resize_tuples(tuple_shape)?;
        Ok(Box::new(out))
    }

    fn try_clone_boxed(&self) -> StructuraResult<Box<dyn AnyArray>> {
        Ok(Box::new(self.clone()))
    }

    fn placeholder_boxed(&self) -> Box<dyn AnyArray> {
        Box::new(NeighborList::<T>::placeholder(self.tuple_shape.clone()))
    }

    fn copy_data_from(&mut self, source: &dyn AnyArray) -> StructuraResult<()> {
        let source = source
            .downcast_ref::<NeighborList<T>>()
            .ok_or_else(|| copy_type_error(&*self, source))?;
        let source_lists = source
            .lists
            .as_ref()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder neighbor list holds no data"))?;
        let lists = self.lists_mut()?;
        if lists.len() != source_lists.len() {
            return Err(copy_len_error(lists.len(), source_lists.len()));
        }
        lists.clone_from(source_lists);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
