//! Fixed-size arrays
//!
//! Arrays are the fixed-length counterpart of lists: their size is set at
//! creation and there is no growth operation. Elements are anchored the same
//! way list elements are.

use crate::context::Context;
use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ArrayValue {
    items: Box<[Handle]>,
}

impl ArrayValue {
    pub(crate) fn from_items(items: Vec<Handle>) -> Self {
        Self {
            items: items.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Handle] {
        &self.items
    }

    pub fn get(&self, index: usize) -> RuntimeResult<Handle> {
        self.items
            .get(index)
            .copied()
            .ok_or(RuntimeError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            })
    }

    pub(crate) fn replace(&mut self, index: usize, handle: Handle) -> RuntimeResult<Handle> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(RuntimeError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, handle))
    }
}

impl Context {
    /// Build an array holding a snapshot of the elements of `list`.
    pub fn array_from(&mut self, list: Handle) -> RuntimeResult<Handle> {
        let items = self.universe.get(list)?.as_list()?.items().to_vec();
        self.anchor_all(&items)?;
        Ok(self
            .universe
            .allocate(Value::Array(ArrayValue::from_items(items))))
    }

    pub fn array_get(&self, array: Handle, index: usize) -> RuntimeResult<Handle> {
        self.universe.get(array)?.as_array()?.get(index)
    }

    pub fn array_set(&mut self, array: Handle, index: usize, item: Handle) -> RuntimeResult<()> {
        self.universe.get(array)?.as_array()?.get(index)?;
        self.universe.anchor(item)?;
        let previous = self
            .universe
            .get_mut(array)?
            .as_array_mut()?
            .replace(index, item)?;
        self.universe.release(previous)
    }

    pub fn array_len(&self, array: Handle) -> RuntimeResult<usize> {
        Ok(self.universe.get(array)?.as_array()?.len())
    }
}
