//! One string per tuple

use std::any::Any;
use structura_core::{DataType, Shape, StructuraError, StructuraResult};

use crate::array::{copy_len_error, copy_type_error, AnyArray, ArrayKind};
use crate::store::StoreKind;

/// String table with one entry per tuple
///
/// Placeholders (`values == None`) carry only the tuple shape.
#[derive(Debug, Clone)]
pub struct StringArray {
    tuple_shape: Shape,
    component_shape: Shape,
    values: Option<Vec<String>>,
}

impl StringArray {
    /// Table of empty strings
    pub fn new(tuple_shape: Shape) -> Self {
        let len = tuple_shape.num_elements();
        Self {
            tuple_shape,
            component_shape: Shape::scalar(1),
            values: Some(vec![String::new(); len]),
        }
    }

    /// Placeholder without values
    pub fn placeholder(tuple_shape: Shape) -> Self {
        Self {
            tuple_shape,
            component_shape: Shape::scalar(1),
            values: None,
        }
    }

    /// Table over existing values as a one-dimensional tuple shape
    pub fn from_values(values: Vec<String>) -> Self {
        Self {
            tuple_shape: Shape::from([values.len()]),
            component_shape: Shape::scalar(1),
            values: Some(values),
        }
    }

    fn values(&self) -> StructuraResult<&Vec<String>> {
        self.values
            .as_ref()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder string array holds no values"))
    }

    /// String at `index`
    pub fn get(&self, index: usize) -> StructuraResult<&str> {
        let values = self.values()?;
        values
            .get(index)
            .map(String::as_str)
            .ok_or(StructuraError::IndexOutOfBounds {
                index,
                len: values.len(),
            })
    }

    /// Replace the string at `index`
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> StructuraResult<()> {
        let values = self
            .values
            .as_mut()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder string array holds no values"))?;
        let len = values.len();
        let slot = values
            .get_mut(index)
            .ok_or(StructuraError::IndexOutOfBounds { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.tuple_shape.num_elements()
    }

    /// True when the table has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnyArray for StringArray {
    fn array_kind(&self) -> ArrayKind {
        ArrayKind::String
    }

    fn data_type(&self) -> Option<DataType> {
        None
    }

    fn tuple_shape(&self) -> &Shape {
        &self.tuple_shape
    }

    fn component_shape(&self) -> &Shape {
        &self.component_shape
    }

    fn store_kind(&self) -> StoreKind {
        if self.values.is_some() {
            StoreKind::InMemory
        } else {
            StoreKind::Empty
        }
    }

    fn resize_tuples(&mut self, tuple_shape: Shape) -> StructuraResult<()> {
        if let Some(values) = self.values.as_mut() {
            values.resize(tuple_shape.num_elements(), String::new());
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
        Box::new(StringArray::placeholder(self.tuple_shape.clone()))
    }

    fn copy_data_from(&mut self, source: &dyn AnyArray) -> StructuraResult<()> {
        let source = source
            .downcast_ref::<StringArray>()
            .ok_or_else(|| copy_type_error(&*self, source))?;
        let source_values = source.values()?;
        let values = self
            .values
            .as_mut()
            .ok_or_else(|| StructuraError::invalid_operation("placeholder string array holds no values"))?;
        if values.len() != source_values.len() {
            return Err(copy_len_error(values.len(), source_values.len()));
        }
        values.clone_from(source_values);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
