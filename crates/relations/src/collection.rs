//! Ordered Collection - positional splice primitive embedded by relationship collections

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};

/// Description of one positional replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayChange {
    /// Position of the first affected element
    pub index: usize,
    /// Number of elements removed at `index`
    pub removed: usize,
    /// Number of elements inserted at `index`
    pub added: usize,
}

impl ArrayChange {
    pub fn new(index: usize, removed: usize, added: usize) -> Self {
        Self { index, removed, added }
    }
}

/// Vec-backed ordered sequence with bounds-checked splicing
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> OrderedCollection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Validate that `[index, index + remove)` lies inside the collection
    pub fn check_range(&self, index: usize, remove: usize) -> RelationResult<Range<usize>> {
        let len = self.items.len();
        match index.checked_add(remove) {
            Some(end) if index <= len && end <= len => Ok(index..end),
            _ => Err(RelationError::OutOfBounds { index, remove, len }),
        }
    }

    /// The elements a splice at `index` removing `remove` would take out
    pub fn slice(&self, index: usize, remove: usize) -> RelationResult<&[T]> {
        let range = self.check_range(index, remove)?;
        Ok(&self.items[range])
    }

    /// Replace `remove` elements at `index` with `inserted`, returning the removed ones
    pub fn splice(
        &mut self,
        index: usize,
        remove: usize,
        inserted: Vec<T>,
    ) -> RelationResult<(ArrayChange, Vec<T>)> {
        let range = self.check_range(index, remove)?;
        let change = ArrayChange::new(index, remove, inserted.len());
        let removed = self.items.splice(range, inserted).collect();
        Ok((change, removed))
    }
}

impl<T: Clone> OrderedCollection<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a OrderedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
