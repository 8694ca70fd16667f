//! Shared ordered dictionary
//!
//! A `Dictionary` is a reference-counted handle. Cloning the handle aliases the
//! same backing store; only [`Dictionary::duplicate`] produces an independent
//! one. Entries keep insertion order (until [`Dictionary::sort`]) and are
//! indexed by their precomputed [`Variant::hash_value`], so the store never
//! hashes a key while its own lock is held.
//!
//! Single operations are atomic. Sequences of operations on a handle shared
//! between threads are not; callers synchronise those themselves.

use super::Array;
use crate::value::{Variant, MAX_RECURSION};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Compact once this many tombstones accumulate and outnumber live entries.
const COMPACT_THRESHOLD: usize = 16;

#[derive(Clone)]
struct Entry {
    hash: u64,
    key: Variant,
    value: Variant,
}

#[derive(Clone, Default)]
struct Store {
    /// Insertion-ordered slots; `None` marks an erased entry
    entries: Vec<Option<Entry>>,
    /// Key hash to slot positions
    index: FxHashMap<u64, Vec<usize>>,
    len: usize,
}

impl Store {
    fn find(&self, hash: u64, key: &Variant) -> Option<usize> {
        self.index.get(&hash)?.iter().copied().find(|&pos| {
            self.entries[pos]
                .as_ref()
                .map_or(false, |entry| entry.key == *key)
        })
    }

    fn insert(&mut self, hash: u64, key: Variant, value: Variant) {
        match self.find(hash, &key) {
            Some(pos) => {
                if let Some(entry) = self.entries[pos].as_mut() {
                    entry.value = value;
                }
            }
            None => {
                let pos = self.entries.len();
                self.entries.push(Some(Entry { hash, key, value }));
                self.index.entry(hash).or_default().push(pos);
                self.len += 1;
            }
        }
    }

    fn remove(&mut self, hash: u64, key: &Variant) -> bool {
        let Some(pos) = self.find(hash, key) else {
            return false;
        };
        self.entries[pos] = None;
        if let Some(bucket) = self.index.get_mut(&hash) {
            bucket.retain(|&p| p != pos);
            if bucket.is_empty() {
                self.index.remove(&hash);
            }
        }
        self.len -= 1;
        self.maybe_compact();
        true
    }

    fn maybe_compact(&mut self) {
        let tombstones = self.entries.len() - self.len;
        if tombstones >= COMPACT_THRESHOLD && tombstones > self.len {
            let live: Vec<Entry> = self.entries.drain(..).flatten().collect();
            self.rebuild(live);
        }
    }

    fn rebuild(&mut self, live: Vec<Entry>) {
        self.index.clear();
        self.len = live.len();
        self.entries = live.into_iter().map(Some).collect();
        for (pos, entry) in self.entries.iter().enumerate() {
            if let Some(entry) = entry {
                self.index.entry(entry.hash).or_default().push(pos);
            }
        }
    }

    fn live(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().flatten()
    }

    fn nth(&self, n: usize) -> Option<&Entry> {
        self.live().nth(n)
    }

    fn next_after(&self, pos: usize) -> Option<&Entry> {
        self.entries[pos + 1..].iter().flatten().next()
    }
}

/// Reference-counted ordered map from `Variant` to `Variant`
#[derive(Clone, Default)]
pub struct Dictionary {
    inner: Arc<RwLock<Store>>,
}

impl Dictionary {
    /// Create an empty dictionary with its own backing store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.read_recursive().len
    }

    /// Check if the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry from the shared store
    pub fn clear(&self) {
        *self.inner.write() = Store::default();
    }

    /// Look up a value
    pub fn get(&self, key: &Variant) -> Option<Variant> {
        let hash = key.hash_value();
        let store = self.inner.read_recursive();
        let pos = store.find(hash, key)?;
        store.entries[pos].as_ref().map(|entry| entry.value.clone())
    }

    /// Look up a value, falling back to `default`
    pub fn get_or(&self, key: &Variant, default: Variant) -> Variant {
        self.get(key).unwrap_or(default)
    }

    /// Insert or overwrite. An existing key keeps its position.
    pub fn set(&self, key: impl Into<Variant>, value: impl Into<Variant>) {
        let key = key.into();
        let hash = key.hash_value();
        self.inner.write().insert(hash, key, value.into());
    }

    /// Check if a key is present
    pub fn has(&self, key: &Variant) -> bool {
        let hash = key.hash_value();
        self.inner.read_recursive().find(hash, key).is_some()
    }

    /// Check if every element of `keys` is present
    pub fn has_all(&self, keys: &Array) -> bool {
        keys.to_vec().iter().all(|key| self.has(key))
    }

    /// Remove a key, returning whether it was present
    pub fn erase(&self, key: &Variant) -> bool {
        let hash = key.hash_value();
        self.inner.write().remove(hash, key)
    }

    /// Keys in iteration order
    pub fn keys(&self) -> Array {
        Array::from(self.key_list())
    }

    /// Values in iteration order
    pub fn values(&self) -> Array {
        let store = self.inner.read_recursive();
        store.live().map(|entry| entry.value.clone()).collect()
    }

    /// Keys in iteration order as a plain vector
    pub fn key_list(&self) -> Vec<Variant> {
        let store = self.inner.read_recursive();
        store.live().map(|entry| entry.key.clone()).collect()
    }

    /// Snapshot of all entries in iteration order
    pub fn entries(&self) -> Vec<(Variant, Variant)> {
        let store = self.inner.read_recursive();
        store
            .live()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    /// Key at a position in iteration order
    pub fn get_key_at_index(&self, index: usize) -> Option<Variant> {
        self.inner.read_recursive().nth(index).map(|e| e.key.clone())
    }

    /// Value at a position in iteration order
    pub fn get_value_at_index(&self, index: usize) -> Option<Variant> {
        self.inner.read_recursive().nth(index).map(|e| e.value.clone())
    }

    /// Iteration cursor.
    ///
    /// `None` yields the first key; `Some(key)` yields the key after `key`.
    /// Returns `None` at the end of the sequence and also when `key` is not
    /// (or no longer) present, so erasing the key just returned and then
    /// asking for its successor ends the walk instead of resuming at an
    /// arbitrary point. Erase the *previous* key to delete while iterating.
    pub fn next(&self, key: Option<&Variant>) -> Option<Variant> {
        let store = self.inner.read_recursive();
        match key {
            None => store.live().next().map(|e| e.key.clone()),
            Some(key) => {
                let pos = store.find(key.hash_value(), key)?;
                store.next_after(pos).map(|e| e.key.clone())
            }
        }
    }

    /// Copy into an independent store.
    ///
    /// With `deep`, nested arrays and dictionaries held as values are
    /// duplicated recursively.
    pub fn duplicate(&self, deep: bool) -> Dictionary {
        self.duplicate_recursive(deep, 0)
    }

    pub(crate) fn duplicate_recursive(&self, deep: bool, depth: usize) -> Dictionary {
        let copy = Dictionary::new();
        if depth > MAX_RECURSION {
            tracing::error!("dictionary nesting exceeds {} levels while copying", MAX_RECURSION);
            return copy;
        }
        let store = self.inner.read_recursive();
        {
            let mut target = copy.inner.write();
            for entry in store.live() {
                let value = if deep {
                    entry.value.duplicate_recursive(true, depth)
                } else {
                    entry.value.clone()
                };
                target.insert(entry.hash, entry.key.clone(), value);
            }
        }
        copy
    }

    /// Sort entries by key, changing iteration order
    pub fn sort(&self) {
        let mut store = self.inner.write();
        let mut live: Vec<Entry> = store.entries.drain(..).flatten().collect();
        live.sort_by(|a, b| a.key.sort_cmp(&b.key));
        store.rebuild(live);
    }

    /// Order-independent structural hash
    pub fn hash_value(&self) -> u64 {
        self.hash_recursive(0)
    }

    pub(crate) fn hash_recursive(&self, depth: usize) -> u64 {
        if depth > MAX_RECURSION {
            tracing::error!("dictionary nesting exceeds {} levels while hashing", MAX_RECURSION);
            return 0;
        }
        let store = self.inner.read_recursive();
        let combined = store.live().fold(0u64, |acc, entry| {
            let mut hasher = FxHasher::default();
            entry.hash.hash(&mut hasher);
            entry.value.hash_recursive(depth + 1).hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        });
        let mut hasher = FxHasher::default();
        store.len.hash(&mut hasher);
        combined.hash(&mut hasher);
        hasher.finish()
    }

    /// Identity of the backing store
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Check if two handles alias the same store
    pub fn is_same(&self, other: &Dictionary) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn eq_recursive(&self, other: &Dictionary, depth: usize) -> bool {
        if self.is_same(other) {
            return true;
        }
        if depth > MAX_RECURSION {
            tracing::error!("dictionary nesting exceeds {} levels while comparing", MAX_RECURSION);
            return false;
        }
        let ours = self.inner.read_recursive();
        let theirs = other.inner.read_recursive();
        if ours.len != theirs.len {
            return false;
        }
        let equal = ours.live().all(|entry| {
            theirs
                .find(entry.hash, &entry.key)
                .and_then(|pos| theirs.entries[pos].as_ref())
                .map_or(false, |other_entry| {
                    other_entry.value.eq_recursive(&entry.value, depth)
                })
        });
        equal
    }

    pub(crate) fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if depth > MAX_RECURSION {
            tracing::error!("dictionary nesting exceeds {} levels while printing", MAX_RECURSION);
            return write!(f, "{{...}}");
        }
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            key.fmt_recursive(f, depth)?;
            write!(f, ": ")?;
            value.fmt_recursive(f, depth)?;
        }
        write!(f, "}}")
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.eq_recursive(other, 0)
    }
}

impl Eq for Dictionary {}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, 0)
    }
}

impl<K: Into<Variant>, V: Into<Variant>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}
