//! Bounded least-recently-used map for compiled query plans.
//!
//! Backed by an [`IndexMap`] whose insertion order *is* the recency order:
//! index 0 is the least recently used entry, the last index the most recent.
//! A hit moves the entry to the back; an insert past capacity pops the front.
//!
//! ```text
//!   front (LRU)                          back (MRU)
//!   ┌──────┬──────┬──────┬──────┐
//!   │  k1  │  k2  │  k3  │  k4  │ ◀── put / get hit
//!   └──────┴──────┴──────┴──────┘
//!      │
//!      └──▶ evicted when len > capacity
//! ```

use std::hash::Hash;

use indexmap::IndexMap;

/// LRU cache with a fixed capacity.
#[derive(Debug, Clone)]
pub struct PlanCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
}

impl<K: Hash + Eq, V> PlanCache<K, V> {
    /// Create an empty cache. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Look up `key`, marking it most recently used on a hit.
    ///
    /// A miss does not insert anything.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get_index(last).map(|(_, v)| v)
    }

    /// Like [`get`](Self::get), falling back to `default` on a miss.
    pub fn get_or<'a>(&'a mut self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Insert or replace `key`, marking it most recently used.
    ///
    /// Returns the entry evicted to stay within capacity, if any. Replacing an
    /// existing key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);
        if self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0)
        } else {
            None
        }
    }

    /// Remove `key` if present.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================
