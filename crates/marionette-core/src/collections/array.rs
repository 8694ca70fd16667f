//! Shared variant array

use crate::value::{Variant, MAX_RECURSION};
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Reference-counted list of variants.
///
/// Cloning aliases the store; [`Array::duplicate`] copies it.
#[derive(Clone, Default)]
pub struct Array {
    inner: Arc<RwLock<Vec<Variant>>>,
}

impl Array {
    /// Create an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.inner.read_recursive().len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Variant>) {
        self.inner.write().push(value.into());
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Variant> {
        self.inner.read_recursive().get(index).cloned()
    }

    /// Overwrite the element at `index`; returns `false` when out of range
    pub fn set(&self, index: usize, value: impl Into<Variant>) -> bool {
        match self.inner.write().get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Remove and return the element at `index`
    pub fn remove(&self, index: usize) -> Option<Variant> {
        let mut items = self.inner.write();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Remove every element
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Check if any element equals `value`
    pub fn contains(&self, value: &Variant) -> bool {
        self.inner.read_recursive().iter().any(|item| item == value)
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Variant> {
        self.inner.read_recursive().clone()
    }

    /// Copy into an independent store, recursing into containers when `deep`
    pub fn duplicate(&self, deep: bool) -> Array {
        self.duplicate_recursive(deep, 0)
    }

    pub(crate) fn duplicate_recursive(&self, deep: bool, depth: usize) -> Array {
        if depth > MAX_RECURSION {
            tracing::error!("array nesting exceeds {} levels while copying", MAX_RECURSION);
            return Array::new();
        }
        let items = self.inner.read_recursive();
        let copy: Vec<Variant> = if deep {
            items
                .iter()
                .map(|item| item.duplicate_recursive(true, depth))
                .collect()
        } else {
            items.clone()
        };
        Array::from(copy)
    }

    /// Order-dependent structural hash
    pub fn hash_value(&self) -> u64 {
        self.hash_recursive(0)
    }

    pub(crate) fn hash_recursive(&self, depth: usize) -> u64 {
        if depth > MAX_RECURSION {
            tracing::error!("array nesting exceeds {} levels while hashing", MAX_RECURSION);
            return 0;
        }
        let mut hasher = FxHasher::default();
        let items = self.inner.read_recursive();
        items.len().hash(&mut hasher);
        for item in items.iter() {
            item.hash_recursive(depth + 1).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Check if two handles alias the same store
    pub fn is_same(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn eq_recursive(&self, other: &Array, depth: usize) -> bool {
        if self.is_same(other) {
            return true;
        }
        if depth > MAX_RECURSION {
            tracing::error!("array nesting exceeds {} levels while comparing", MAX_RECURSION);
            return false;
        }
        let ours = self.inner.read_recursive();
        let theirs = other.inner.read_recursive();
        let equal = ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| a.eq_recursive(b, depth));
        equal
    }

    pub(crate) fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if depth > MAX_RECURSION {
            tracing::error!("array nesting exceeds {} levels while printing", MAX_RECURSION);
            return write!(f, "[...]");
        }
        write!(f, "[")?;
        for (i, item) in self.to_vec().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            item.fmt_recursive(f, depth)?;
        }
        write!(f, "]")
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.eq_recursive(other, 0)
    }
}

impl Eq for Array {}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, 0)
    }
}

impl From<Vec<Variant>> for Array {
    fn from(items: Vec<Variant>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(items)),
        }
    }
}

impl<V: Into<Variant>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Array::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}
