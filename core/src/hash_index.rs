//! Generic hash-indexed, insertion-ordered map.
//!
//! An open-addressed map keyed by caller-supplied hash and equality,
//! doubling on resize, exposing `find_or_insert(key) -> (entry_ref,
//! existed)`, with no requirement on iteration order beyond what the
//! backing map happens to give. [`indexmap`] is the idiomatic
//! crates.io stand-in: "hash lookup plus stable insertion order" is a
//! strictly more useful guarantee, used here for symbol/situation/
//! item-set/forest dedup alike.

use indexmap::IndexMap;
use std::hash::Hash;

/// A dedup table: `find_or_insert` returns the existing index if
/// `key` was already present, or inserts `value` and returns the new
/// one. Indices are stable for the life of the index (`indexmap`
/// never relocates existing entries on insert).
#[derive(Debug, Clone)]
pub struct HashIndex<K, V> {
    map: IndexMap<K, V>,
}

impl<K, V> Default for HashIndex<K, V> {
    fn default() -> Self {
        Self {
            map: IndexMap::new(),
        }
    }
}

impl<K, V> HashIndex<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(index, existed)`. On a fresh key, `value_for_new` is
    /// invoked to materialize the value that gets stored.
    pub fn find_or_insert(&mut self, key: K, value_for_new: impl FnOnce() -> V) -> (usize, bool) {
        if let Some(index) = self.map.get_index_of(&key) {
            (index, true)
        } else {
            let (index, _) = self.map.insert_full(key, value_for_new());
            (index, false)
        }
    }

    pub fn get_index_of(&self, key: &K) -> Option<usize> {
        self.map.get_index_of(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_by_index(&self, index: usize) -> Option<(&K, &V)> {
        self.map.get_index(index)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.shift_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_insert_dedups() {
        let mut idx: HashIndex<&str, u32> = HashIndex::new();
        let (i1, existed1) = idx.find_or_insert("a", || 100);
        let (i2, existed2) = idx.find_or_insert("a", || 200);
        assert!(!existed1);
        assert!(existed2);
        assert_eq!(i1, i2);
        assert_eq!(*idx.get(&"a").unwrap(), 100);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut idx: HashIndex<&str, u32> = HashIndex::new();
        idx.find_or_insert("z", || 1);
        idx.find_or_insert("a", || 2);
        let keys: Vec<_> = idx.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
