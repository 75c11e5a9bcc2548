//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for capacity eviction.

use std::collections::BTreeMap;

// == LRU Tracker ==
/// Tracks access order for the LRU eviction strategy.
///
/// Keys are indexed by the recency tick of their last use:
/// - Smallest tick = Least recently used
/// - Largest tick = Most recently used
///
/// Ticks are handed out by the owning store and must be unique.
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Keys ordered by last-use tick
    order: BTreeMap<u64, K>,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Starts tracking a key at `tick`.
    pub fn insert(&mut self, tick: u64, key: K) {
        self.order.insert(tick, key);
    }

    // == Touch ==
    /// Marks a key as recently used by moving it from `old_tick` to `new_tick`.
    pub fn touch(&mut self, old_tick: u64, new_tick: u64) {
        if let Some(key) = self.order.remove(&old_tick) {
            self.order.insert(new_tick, key);
        }
    }

    // == Remove ==
    /// Stops tracking the key recorded at `tick`.
    pub fn remove(&mut self, tick: u64) -> Option<K> {
        self.order.remove(&tick)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}
