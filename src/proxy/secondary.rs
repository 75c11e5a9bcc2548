//! Secondary Key Proxy
//!
//! Indexes an underlying cache by an alternate key without duplicating values.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Cache, Subscription};

// == Index ==
/// Secondary to primary mapping, with the reverse direction kept alongside
/// so a removed primary finds its secondaries without a full scan.
struct Index<PK, K> {
    forward: HashMap<PK, K>,
    reverse: HashMap<K, HashSet<PK>>,
}

impl<PK, K> Index<PK, K>
where
    PK: Eq + Hash + Clone,
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    fn insert(&mut self, secondary: PK, primary: K) {
        if let Some(previous) = self.forward.insert(secondary.clone(), primary.clone()) {
            self.unlink(&previous, &secondary);
        }
        self.reverse.entry(primary).or_default().insert(secondary);
    }

    fn remove<Q>(&mut self, secondary: &Q) -> Option<K>
    where
        PK: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (secondary, primary) = self.forward.remove_entry(secondary)?;
        self.unlink(&primary, &secondary);
        Some(primary)
    }

    /// Drops every secondary key mapped to `primary`.
    fn remove_primary(&mut self, primary: &K) -> usize {
        let Some(secondaries) = self.reverse.remove(primary) else {
            return 0;
        };
        for secondary in &secondaries {
            self.forward.remove(secondary);
        }
        secondaries.len()
    }

    fn unlink(&mut self, primary: &K, secondary: &PK) {
        if let Some(secondaries) = self.reverse.get_mut(primary) {
            secondaries.remove(secondary);
            if secondaries.is_empty() {
                self.reverse.remove(primary);
            }
        }
    }
}

// == Proxy ==
/// Addresses entries of a [`Cache<K, V>`] by a secondary key `PK`.
///
/// The proxy stores only the `PK -> K` mapping; values live in the cache and
/// are returned exactly as the cache returns them. With `V = Arc<T>` a lookup
/// through the proxy and one through the cache yield the same allocation.
///
/// The mapping and the cache are locked independently. A proxy built with
/// [`Proxy::new`] is not told when the cache drops an entry, so a secondary
/// key can outlive its primary entry; reading it then reports absence and
/// leaves the mapping in place. [`Proxy::linked`] removes such mappings as
/// the cache reports removals.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use freshcache::{Cache, Proxy, NO_EXPIRATION};
///
/// let sites: Cache<u64, Arc<String>> = Cache::new(100, NO_EXPIRATION, NO_EXPIRATION);
/// let by_host: Proxy<String, u64, Arc<String>> = Proxy::new(sites.clone());
///
/// by_host.set(42, "example.com".to_string(), Arc::new("site 42".to_string()));
///
/// let by_id = sites.get(&42).unwrap();
/// let by_name = by_host.get("example.com").unwrap();
/// assert!(Arc::ptr_eq(&by_id, &by_name));
/// ```
pub struct Proxy<PK, K, V> {
    cache: Cache<K, V>,
    index: Arc<Mutex<Index<PK, K>>>,
    /// Removal listener of a linked proxy, shared by its clones
    subscription: Option<Arc<Subscription>>,
}

impl<PK, K, V> Clone for Proxy<PK, K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            index: Arc::clone(&self.index),
            subscription: self.subscription.clone(),
        }
    }
}

impl<PK, K, V> Proxy<PK, K, V>
where
    PK: Eq + Hash + Clone + Send + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a proxy over `cache`. Mappings are never dropped implicitly.
    pub fn new(cache: Cache<K, V>) -> Self {
        Self {
            cache,
            index: Arc::new(Mutex::new(Index::new())),
            subscription: None,
        }
    }

    /// Creates a proxy that drops the mappings of a primary key once its
    /// entry leaves the cache through deletion, purge or capacity eviction.
    ///
    /// Entries that are expired but not yet purged keep their mappings until
    /// the purge reclaims them. A primary key that is live again by the time
    /// the removal is reported keeps its mappings. The listener is
    /// unregistered when the last clone of the proxy is dropped.
    pub fn linked(cache: Cache<K, V>) -> Self {
        let mut proxy = Self::new(cache);
        let index = Arc::downgrade(&proxy.index);
        let weak_cache = proxy.cache.downgrade();

        let subscription = proxy.cache.subscribe(move |primary: &K, _: &V, _| {
            // Only one lock at a time: the cache check finishes before the
            // index is locked
            let live = weak_cache
                .upgrade()
                .is_some_and(|cache| cache.contains_key(primary));
            if live {
                return;
            }
            if let Some(index) = index.upgrade() {
                index.lock().remove_primary(primary);
            }
        });
        proxy.subscription = Some(Arc::new(subscription));
        proxy
    }

    // == Set ==
    /// Stores `value` in the cache under `primary` with the cache's default
    /// expiration, then maps `secondary` to `primary`.
    ///
    /// The two writes are not atomic; nothing is retried or rolled back.
    pub fn set(&self, primary: K, secondary: PK, value: V) {
        self.cache.set(primary.clone(), value);
        self.index.lock().insert(secondary, primary);
    }

    // == Get ==
    /// Resolves `secondary` and returns the cache's answer for its primary key.
    pub fn get<Q>(&self, secondary: &Q) -> Option<V>
    where
        PK: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let primary = self.key(secondary)?;
        self.cache.get(&primary)
    }

    // == Delete ==
    /// Removes the mapping for `secondary` and deletes its primary entry.
    pub fn delete<Q>(&self, secondary: &Q)
    where
        PK: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let primary = self.index.lock().remove(secondary);
        if let Some(primary) = primary {
            self.cache.delete(&primary);
        }
    }

    /// Returns the primary key `secondary` maps to, without touching the cache.
    pub fn key<Q>(&self, secondary: &Q) -> Option<K>
    where
        PK: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.lock().forward.get(secondary).cloned()
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Cache<K, V> {
        &self.cache
    }

    /// Returns true if this proxy drops mappings as the cache removes entries.
    pub fn is_linked(&self) -> bool {
        self.subscription.is_some()
    }

    /// Number of secondary keys, including stale ones.
    pub fn len(&self) -> usize {
        self.index.lock().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().forward.is_empty()
    }
}
