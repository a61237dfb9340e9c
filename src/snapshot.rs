//! Immutable name-to-value snapshots.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// An immutable mapping from name to value.
///
/// Snapshots are the currency of the engine: the caller supplies a fresh
/// input snapshot on every tick, and [`resolve`](crate::DeriveRuntime::resolve)
/// hands back an output snapshot containing every input key plus every
/// derived key. Output snapshots become the previous-output snapshot of the
/// following tick.
///
/// Keys that no deriver recognizes pass through unchanged. A derived key
/// that collides with an input key shadows the input in the output.
pub struct Snapshot<K, V> {
    entries: HashMap<K, V, ahash::RandomState>,
}

impl<K, V> Snapshot<K, V> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            entries: HashMap::default(),
        }
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Iterate over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K, V> Snapshot<K, V>
where
    K: Eq + Hash,
{
    /// Get the value stored under `name`, if any.
    pub fn get(&self, name: &K) -> Option<&V> {
        self.entries.get(name)
    }

    /// Returns `true` if the snapshot holds a value under `name`.
    pub fn contains(&self, name: &K) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, name: K, value: V) -> Option<V> {
        self.entries.insert(name, value)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: K, value: V) -> Self {
        self.entries.insert(name, value);
        self
    }
}

impl<K, V> Default for Snapshot<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for Snapshot<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K: Debug, V: Debug> Debug for Snapshot<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K: Eq + Hash, V: PartialEq> PartialEq for Snapshot<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq + Hash, V: Eq> Eq for Snapshot<K, V> {}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for Snapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K: Eq + Hash, V> Extend<(K, V)> for Snapshot<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<K, V> IntoIterator for Snapshot<K, V> {
    type Item = (K, V);
    type IntoIter = std::collections::hash_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Snapshot<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
