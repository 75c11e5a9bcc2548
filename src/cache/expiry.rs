//! Expiry Queue Module
//!
//! Deadline-ordered index of entries that carry a TTL. Lets the purge pass
//! and capacity eviction find expired entries without scanning the whole map.

use std::collections::BTreeMap;

use tokio::time::Instant;

// == Expiry Queue ==
/// Keys ordered by `(deadline, insertion sequence)`.
///
/// Entries without expiration are never scheduled.
#[derive(Debug)]
pub struct ExpiryQueue<K> {
    deadlines: BTreeMap<(Instant, u64), K>,
}

impl<K> Default for ExpiryQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ExpiryQueue<K> {
    pub fn new() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }

    // == Schedule ==
    /// Records that the entry inserted as `seq` expires at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, seq: u64, key: K) {
        self.deadlines.insert((deadline, seq), key);
    }

    // == Cancel ==
    /// Forgets a scheduled deadline (entry deleted or overwritten).
    pub fn cancel(&mut self, deadline: Instant, seq: u64) {
        self.deadlines.remove(&(deadline, seq));
    }

    // == Pop Expired ==
    /// Removes and returns up to `limit` keys whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_expired(&mut self, now: Instant, limit: usize) -> Vec<K> {
        let mut expired = Vec::new();
        while expired.len() < limit {
            match self.deadlines.first_key_value() {
                Some((&(deadline, _), _)) if deadline <= now => {
                    if let Some((_, key)) = self.deadlines.pop_first() {
                        expired.push(key);
                    }
                }
                _ => break,
            }
        }
        expired
    }

    // == Peek Expired ==
    /// Returns the earliest scheduled key if its deadline has passed.
    pub fn peek_expired(&self, now: Instant) -> Option<&K> {
        self.deadlines
            .first_key_value()
            .filter(|((deadline, _), _)| *deadline <= now)
            .map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
