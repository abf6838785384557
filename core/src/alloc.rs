//! Bulk allocation pools with scoped release.
//!
//! A pool groups many small allocations under one lifetime, with
//! `alloc`/`reset`/`free`, where a failing `alloc` records
//! `NO_MEMORY` in the error context rather than aborting. Rust's
//! allocator already gives us fallible-on-OOM collections for free,
//! so the pool here is deliberately thin: it is a typed arena (one
//! `Vec<T>` per pool) that hands out stable dense indices instead of
//! raw pointers, so a forest arena can store back-references as
//! `(node-id, edge-kind)` indices rather than owning pointers.
//!
//! Two pools exist: the grammar's long-lived pool (append-only after
//! `finalize`, lives as long as the `Grammar`), and a transient pool
//! tied to a single `parse` call, released in full when the call
//! returns.

use crate::error::{Error, Result};

/// A dense, append-only arena of `T`, addressed by [`Id`].
///
/// `reset` truncates back to empty without deallocating backing
/// storage: `reset` is cheap reuse between parses on the same
/// grammar's transient pool, `free` is dropping the arena outright.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u32);

impl Id {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Bulk-allocate `value`, returning its stable id. Fails with
    /// `Error::NoMemory` rather than aborting the process; allocator
    /// failures are recoverable by the caller.
    pub fn alloc(&mut self, value: T) -> Result<Id> {
        if self.items.len() >= u32::MAX as usize {
            return Err(Error::NoMemory {
                context: "arena exhausted its 32-bit id space".to_string(),
            });
        }
        let id = Id(self.items.len() as u32);
        self.items.push(value);
        Ok(id)
    }

    pub fn get(&self, id: Id) -> &T {
        &self.items[id.index()]
    }

    pub fn get_mut(&mut self, id: Id) -> &mut T {
        &mut self.items[id.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_with_ids(&self) -> impl Iterator<Item = (Id, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (Id(i as u32), v))
    }

    /// Truncate back to empty, keeping the backing allocation. Used
    /// to recycle a parse's transient pools between `parse` calls on
    /// the same grammar.
    pub fn reset(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_dense_stable_ids() {
        let mut arena = Arena::new();
        let a = arena.alloc("a").unwrap();
        let b = arena.alloc("b").unwrap();
        assert_eq!(a, Id(0));
        assert_eq!(b, Id(1));
        assert_eq!(*arena.get(a), "a");
        assert_eq!(*arena.get(b), "b");
    }

    #[test]
    fn reset_clears_without_losing_capacity() {
        let mut arena = Arena::new();
        arena.alloc(1).unwrap();
        arena.alloc(2).unwrap();
        let cap_before = arena.items.capacity();
        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.items.capacity(), cap_before);
    }
}
