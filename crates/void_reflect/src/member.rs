//! Reflected member storage
//!
//! A [`Member`] is a fixed-length run of values owned by a reflected object.
//! A [`Datum`](crate::Datum) bound to it through a signature (or through
//! [`Datum::set_storage`](crate::Datum::set_storage)) is a live view: writes
//! through either side are visible to the other.
//!
//! Cloning a `Member` copies the values into fresh storage. Views taken from
//! the source keep pointing at the source, so every copy of a reflected
//! object has its views re-bound after cloning.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Fixed-length value storage a datum can view
pub struct Member<T> {
    cells: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone> Member<T> {
    /// Create from a list of values; the length is fixed from here on
    pub fn new(values: impl Into<Vec<T>>) -> Self {
        Self {
            cells: Rc::new(RefCell::new(values.into())),
        }
    }

    /// Single-element member
    pub fn scalar(value: T) -> Self {
        Self::new(vec![value])
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    /// True for a zero-length member
    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    /// Read an element
    pub fn get(&self, index: usize) -> Option<T> {
        self.cells.borrow().get(index).cloned()
    }

    /// Write an element. Returns false when `index` is past the end.
    pub fn set(&self, index: usize, value: T) -> bool {
        match self.cells.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy out every element
    pub fn to_vec(&self) -> Vec<T> {
        self.cells.borrow().clone()
    }

    /// True when both members are the same storage
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }

    pub(crate) fn cells(&self) -> Rc<RefCell<Vec<T>>> {
        Rc::clone(&self.cells)
    }
}

impl<T: Clone + Default> Member<T> {
    /// First element, or the default value for an empty member
    pub fn value(&self) -> T {
        self.get(0).unwrap_or_default()
    }
}

impl<T: Clone> Clone for Member<T> {
    fn clone(&self) -> Self {
        Self::new(self.to_vec())
    }
}

impl<T: Clone + Default> Default for Member<T> {
    /// A single default element
    fn default() -> Self {
        Self::scalar(T::default())
    }
}

impl<T: Clone + PartialEq> PartialEq for Member<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.cells.borrow() == *other.cells.borrow()
    }
}

impl<T: fmt::Debug> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Member").field(&*self.cells.borrow()).finish()
    }
}

impl<T: Clone> From<T> for Member<T> {
    fn from(value: T) -> Self {
        Self::scalar(value)
    }
}
