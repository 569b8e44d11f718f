//! Growable lists
//!
//! A list stores handles, not values. Every handle placed into a list is
//! anchored by the list and released again when it is overwritten or when the
//! list itself is reclaimed.

use crate::context::Context;
use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::value::Value;

/// Initial capacity of an empty list, doubled on overflow.
const INITIAL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ListValue {
    items: Vec<Handle>,
}

impl ListValue {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub(crate) fn from_items(items: Vec<Handle>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
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

    /// Append, doubling the capacity when full.
    pub(crate) fn push(&mut self, handle: Handle) {
        if self.items.len() == self.items.capacity() {
            let grow_by = self.items.capacity().max(INITIAL_CAPACITY);
            self.items.reserve_exact(grow_by);
        }
        self.items.push(handle);
    }

    /// Replace the element at `index`, returning the previous handle.
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
    /// Create an empty list.
    pub fn list_new(&mut self) -> Handle {
        self.universe.allocate(Value::List(ListValue::new()))
    }

    /// Append `item` to `list`.
    pub fn list_add(&mut self, list: Handle, item: Handle) -> RuntimeResult<()> {
        self.universe.get(list)?.as_list()?;
        self.universe.anchor(item)?;
        self.universe.get_mut(list)?.as_list_mut()?.push(item);
        Ok(())
    }

    pub fn list_get(&self, list: Handle, index: usize) -> RuntimeResult<Handle> {
        self.universe.get(list)?.as_list()?.get(index)
    }

    /// Overwrite the element at `index`. The previous element loses the
    /// list's anchor.
    pub fn list_set(&mut self, list: Handle, index: usize, item: Handle) -> RuntimeResult<()> {
        self.universe.get(list)?.as_list()?.get(index)?;
        self.universe.anchor(item)?;
        let previous = self.universe.get_mut(list)?.as_list_mut()?.replace(index, item)?;
        self.universe.release(previous)
    }

    pub fn list_len(&self, list: Handle) -> RuntimeResult<usize> {
        Ok(self.universe.get(list)?.as_list()?.len())
    }

    /// Snapshot `list` into a new, independent list holding the same element
    /// handles. Later changes to either list do not affect the other.
    pub fn list_clone(&mut self, list: Handle) -> RuntimeResult<Handle> {
        let items = self.universe.get(list)?.as_list()?.items().to_vec();
        self.anchor_all(&items)?;
        Ok(self
            .universe
            .allocate(Value::List(ListValue::from_items(items))))
    }

    /// Build a list of integers from native values.
    pub fn list_from_ints(&mut self, values: &[i64]) -> Handle {
        // The list takes over the anchor each `int` hands out
        let items = values.iter().map(|&n| self.int(n)).collect();
        self.universe
            .allocate(Value::List(ListValue::from_items(items)))
    }

    /// Anchor every handle in `items`, or none of them if any is stale.
    pub(crate) fn anchor_all(&mut self, items: &[Handle]) -> RuntimeResult<()> {
        for &item in items {
            self.universe.get(item)?;
        }
        for &item in items {
            self.universe.anchor(item)?;
        }
        Ok(())
    }

    /// Read a list of integers into a native vector.
    pub fn list_to_ints(&self, list: Handle) -> RuntimeResult<Vec<i64>> {
        self.universe
            .get(list)?
            .as_list()?
            .items()
            .iter()
            .map(|&item| self.int_value(item))
            .collect()
    }
}
