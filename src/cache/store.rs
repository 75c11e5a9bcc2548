//! Cache Store Module
//!
//! Single-threaded cache engine combining HashMap storage with LRU tracking
//! and TTL expiration. Callers supply the current instant so that every
//! decision is made against one consistent clock reading.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats, Expiration, ExpiryQueue, LruTracker};

// == Removal Cause ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// Removed by `delete` or `pop`
    Deleted,
    /// Its deadline passed and it was reclaimed
    Expired,
    /// Evicted to make room for a new key
    Capacity,
}

// == Cache Store ==
/// Cache storage with capacity-bounded LRU eviction and TTL support.
///
/// Expired entries are never returned by reads but stay in the map until a
/// purge pass or capacity eviction reclaims them.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Deadlines of entries that carry a TTL
    expiry: ExpiryQueue<K>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed, 0 = unbounded
    capacity: usize,
    /// Expiration for entries inserted without an explicit one
    default_expiration: Expiration,
    /// Monotonic counter for insertion sequence and recency ticks
    tick: u64,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default expiration.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, 0 for no bound
    /// * `default_expiration` - Applied by [`CacheStore::insert_default`]
    pub fn new(capacity: usize, default_expiration: Expiration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            expiry: ExpiryQueue::new(),
            stats: CacheStats::new(),
            capacity,
            default_expiration,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Insert ==
    /// Stores a key-value pair expiring according to `expiration`.
    ///
    /// If the key already exists, the value and its deadline are replaced.
    /// If the key is new and the cache is full, one entry is evicted first:
    /// an already expired entry when there is one, otherwise the least
    /// recently used entry. The evicted pair is returned.
    pub fn insert(
        &mut self,
        key: K,
        value: V,
        expiration: Expiration,
        now: Instant,
    ) -> Option<(K, V, RemovalCause)> {
        let mut evicted = None;

        if let Some(previous) = self.entries.remove(&key) {
            self.forget(&previous);
        } else if self.capacity > 0 && self.entries.len() >= self.capacity {
            evicted = self.evict_one(now);
        }

        let seq = self.next_tick();
        let entry = CacheEntry::new(value, expiration, now, seq);
        self.lru.insert(seq, key.clone());
        if let Some(deadline) = entry.expires_at {
            self.expiry.schedule(deadline, seq, key.clone());
        }
        self.entries.insert(key, entry);

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    /// Stores a key-value pair with the default expiration.
    pub fn insert_default(&mut self, key: K, value: V, now: Instant) -> Option<(K, V, RemovalCause)> {
        let expiration = self.default_expiration;
        self.insert(key, value, expiration, now)
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries count as misses and are left in place. A hit marks
    /// the entry as recently used but never changes its deadline.
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key, now).map(|entry| entry.value.clone())
    }

    /// Retrieves a live value together with its deadline.
    pub fn get_with_expiration<Q>(&mut self, key: &Q, now: Instant) -> Option<(V, Option<Instant>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key, now)
            .map(|entry| (entry.value.clone(), entry.expires_at))
    }

    fn lookup<Q>(&mut self, key: &Q, now: Instant) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.lru.touch(entry.last_used, tick);
                entry.last_used = tick;
                self.stats.record_hit();
                Some(&*entry)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Contains ==
    /// Checks for a live entry without affecting recency or statistics.
    pub fn contains_key<Q>(&self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Remove ==
    /// Removes an entry by key, expired or not.
    ///
    /// Returns the stored key and entry, or None if the key was absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (key, entry) = self.entries.remove_entry(key)?;
        self.forget(&entry);
        self.stats.set_total_entries(self.entries.len());
        Some((key, entry))
    }

    // == Pop ==
    /// Removes an entry by key and reports why it left.
    ///
    /// An entry already expired at `now` counts as an expiration and comes
    /// back with [`RemovalCause::Expired`]; a live one with `Deleted`.
    pub fn pop<Q>(&mut self, key: &Q, now: Instant) -> Option<(K, V, RemovalCause)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (key, entry) = self.remove(key)?;
        let cause = if entry.is_expired_at(now) {
            self.stats.record_expirations(1);
            RemovalCause::Expired
        } else {
            RemovalCause::Deleted
        };
        Some((key, entry.value, cause))
    }

    // == Purge Expired ==
    /// Removes up to `limit` entries whose deadline has passed at `now`.
    ///
    /// Returns the removed pairs, earliest deadline first.
    pub fn purge_expired(&mut self, now: Instant, limit: usize) -> Vec<(K, V)> {
        let mut removed = Vec::new();

        for key in self.expiry.pop_expired(now, limit) {
            let expired = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.is_expired_at(now));
            if !expired {
                continue;
            }
            if let Some((key, entry)) = self.entries.remove_entry(&key) {
                self.lru.remove(entry.last_used);
                removed.push((key, entry.value));
            }
        }

        self.stats.record_expirations(removed.len());
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.expiry.clear();
        self.stats.set_total_entries(0);
    }

    // == Snapshots ==
    /// Returns the keys of all live entries.
    pub fn keys(&self, now: Instant) -> Vec<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns a copy of all live entries.
    pub fn items(&self, now: Instant) -> HashMap<K, V> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_expiration(&self) -> Expiration {
        self.default_expiration
    }

    fn forget(&mut self, entry: &CacheEntry<V>) {
        self.lru.remove(entry.last_used);
        if let Some(deadline) = entry.expires_at {
            self.expiry.cancel(deadline, entry.seq);
        }
    }

    fn evict_one(&mut self, now: Instant) -> Option<(K, V, RemovalCause)> {
        let (victim, cause) = match self.expiry.peek_expired(now) {
            Some(key) => (key.clone(), RemovalCause::Expired),
            None => (self.lru.peek_oldest()?.clone(), RemovalCause::Capacity),
        };

        let (key, entry) = self.entries.remove_entry(&victim)?;
        self.forget(&entry);
        match cause {
            RemovalCause::Expired => self.stats.record_expirations(1),
            _ => self.stats.record_eviction(),
        }
        Some((key, entry.value, cause))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NO_EXPIRATION;
    use std::time::Duration;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn store(capacity: usize) -> CacheStore<String, String> {
        CacheStore::new(capacity, Expiration::After(FIVE_MINUTES))
    }

    fn set(store: &mut CacheStore<String, String>, key: &str, value: &str, now: Instant) {
        store.insert_default(key.to_string(), value.to_string(), now);
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
        assert_eq!(store.default_expiration(), Expiration::After(FIVE_MINUTES));
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "foo", "bar", now);

        assert_eq!(store.get("foo", now), Some("bar".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(100);
        assert_eq!(store.get("nonexistent", Instant::now()), None);
    }

    #[test]
    fn test_store_remove_is_idempotent() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "key1", "value1", now);
        assert!(store.remove("key1").is_some());
        assert!(store.remove("key1").is_none());

        assert!(store.is_empty());
        assert_eq!(store.get("key1", now), None);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key1", "value2", now);

        assert_eq!(store.get("key1", now), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_replaces_deadline() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("key".to_string(), "v1".to_string(), Duration::from_secs(1).into(), now);
        store.insert("key".to_string(), "v2".to_string(), NO_EXPIRATION, now);

        let later = now + Duration::from_secs(3600);
        assert_eq!(store.get("key", later), Some("v2".to_string()));
        assert!(store.purge_expired(later, usize::MAX).is_empty());
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("key1".to_string(), "value1".to_string(), Duration::from_secs(1).into(), now);

        assert!(store.get("key1", now).is_some());
        assert!(store.get("key1", now + Duration::from_millis(999)).is_some());
        assert_eq!(store.get("key1", now + Duration::from_secs(1)), None);

        // Lazy expiration: still stored until purged
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_zero_ttl_is_immediately_expired() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("key".to_string(), "value".to_string(), Duration::ZERO.into(), now);

        assert_eq!(store.get("key", now), None);
        assert!(!store.contains_key("key", now));
    }

    #[test]
    fn test_store_no_expiration_persists() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("baz".to_string(), "never".to_string(), NO_EXPIRATION, now);

        let much_later = now + Duration::from_secs(10 * 365 * 24 * 3600);
        assert_eq!(store.get("baz", much_later), Some("never".to_string()));
    }

    #[test]
    fn test_store_get_does_not_extend_ttl() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("key".to_string(), "value".to_string(), Duration::from_secs(10).into(), now);
        let (_, deadline) = store
            .get_with_expiration("key", now + Duration::from_secs(9))
            .unwrap();

        assert_eq!(deadline, Some(now + Duration::from_secs(10)));
        assert_eq!(store.get("key", now + Duration::from_secs(10)), None);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = store(3);
        let now = Instant::now();

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key2", "value2", now);
        set(&mut store, "key3", "value3", now);

        // Cache is full, adding key4 should evict key1 (oldest)
        let evicted = store.insert_default("key4".to_string(), "value4".to_string(), now);

        assert_eq!(
            evicted,
            Some(("key1".to_string(), "value1".to_string(), RemovalCause::Capacity))
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1", now), None);
        assert!(store.get("key2", now).is_some());
        assert!(store.get("key3", now).is_some());
        assert!(store.get("key4", now).is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = store(3);
        let now = Instant::now();

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key2", "value2", now);
        set(&mut store, "key3", "value3", now);

        // Access key1 to make it most recently used
        store.get("key1", now).unwrap();

        // Adding key4 should evict key2 (now oldest)
        set(&mut store, "key4", "value4", now);

        assert!(store.get("key1", now).is_some());
        assert_eq!(store.get("key2", now), None);
    }

    #[test]
    fn test_store_evicts_expired_before_lru() {
        let mut store = store(3);
        let now = Instant::now();

        set(&mut store, "old", "live", now);
        store.insert("short".to_string(), "ttl".to_string(), Duration::from_secs(1).into(), now);
        set(&mut store, "new", "live", now);

        let later = now + Duration::from_secs(2);
        let evicted = store.insert_default("extra".to_string(), "value".to_string(), later);

        assert_eq!(
            evicted,
            Some(("short".to_string(), "ttl".to_string(), RemovalCause::Expired))
        );
        assert!(store.get("old", later).is_some());
        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let mut store = store(2);
        let now = Instant::now();

        set(&mut store, "a", "1", now);
        set(&mut store, "b", "2", now);
        let evicted = store.insert_default("a".to_string(), "3".to_string(), now);

        assert!(evicted.is_none());
        assert_eq!(store.len(), 2);
        assert!(store.get("b", now).is_some());
    }

    #[test]
    fn test_store_zero_capacity_is_unbounded() {
        let mut store = store(0);
        let now = Instant::now();

        for i in 0..1000 {
            set(&mut store, &format!("key{}", i), "value", now);
        }

        assert_eq!(store.len(), 1000);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_pop_reports_cause() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "live", "1", now);
        store.insert("dead".to_string(), "2".to_string(), Duration::ZERO.into(), now);

        assert_eq!(
            store.pop("live", now),
            Some(("live".to_string(), "1".to_string(), RemovalCause::Deleted))
        );
        assert_eq!(
            store.pop("dead", now),
            Some(("dead".to_string(), "2".to_string(), RemovalCause::Expired))
        );
        assert_eq!(store.pop("dead", now), None);
        assert_eq!(store.stats().expirations, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "key1", "value1", now);
        store.get("key1", now).unwrap(); // hit
        let _ = store.get("nonexistent", now); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_purge_expired() {
        let mut store = store(100);
        let now = Instant::now();

        store.insert("key1".to_string(), "value1".to_string(), Duration::from_secs(1).into(), now);
        store.insert("key2".to_string(), "value2".to_string(), Duration::from_secs(10).into(), now);
        store.insert("key3".to_string(), "value3".to_string(), NO_EXPIRATION, now);

        let removed = store.purge_expired(now + Duration::from_secs(2), usize::MAX);

        assert_eq!(removed, vec![("key1".to_string(), "value1".to_string())]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().expirations, 1);
        assert!(store.get("key2", now + Duration::from_secs(2)).is_some());
    }

    #[test]
    fn test_store_purge_respects_batch_limit() {
        let mut store = store(0);
        let now = Instant::now();

        for i in 0..10 {
            store.insert(format!("key{}", i), "v".to_string(), Duration::ZERO.into(), now);
        }

        assert_eq!(store.purge_expired(now, 4).len(), 4);
        assert_eq!(store.len(), 6);
        assert_eq!(store.purge_expired(now, 100).len(), 6);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_snapshots_skip_expired() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "live", "1", now);
        store.insert("dead".to_string(), "2".to_string(), Duration::ZERO.into(), now);

        assert_eq!(store.keys(now), vec!["live".to_string()]);
        let items = store.items(now);
        assert_eq!(items.len(), 1);
        assert_eq!(items.get("live"), Some(&"1".to_string()));
    }

    #[test]
    fn test_store_clear() {
        let mut store = store(100);
        let now = Instant::now();

        set(&mut store, "a", "1", now);
        set(&mut store, "b", "2", now);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get("a", now), None);
        assert!(store.purge_expired(now + FIVE_MINUTES, usize::MAX).is_empty());
    }
}
