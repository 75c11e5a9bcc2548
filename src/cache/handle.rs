//! Cache Handle Module
//!
//! Thread-safe, cheaply cloneable handle over a [`CacheStore`], with removal
//! listeners and an owned background purge task.

use std::any::Any;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, Expiration, RemovalCause, PURGE_BATCH_SIZE};
use crate::error::Result;
use crate::tasks::{spawn_purge_task, PurgeHandle};

/// Callback invoked after an entry leaves the cache.
pub type EvictionListener<K, V> = Arc<dyn Fn(&K, &V, RemovalCause) + Send + Sync>;

/// Value type of the untyped cache variant.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Cache holding values of different types behind [`AnyValue`].
pub type AnyCache<K> = Cache<K, AnyValue>;

/// Identifies a registered listener, see [`Cache::remove_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Shared<K, V> {
    store: Mutex<CacheStore<K, V>>,
    listeners: RwLock<Vec<(ListenerId, EvictionListener<K, V>)>>,
    next_listener: AtomicU64,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn notify(&self, key: &K, value: &V, cause: RemovalCause) {
        // Snapshot so listeners may register listeners
        let listeners = self.listeners.read().clone();
        for (_, listener) in &listeners {
            listener(key, value, cause);
        }
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Removes every expired entry, one batch per lock acquisition.
    fn purge_expired(&self) -> usize {
        let mut total = 0;
        loop {
            let removed = self
                .store
                .lock()
                .purge_expired(Instant::now(), PURGE_BATCH_SIZE);
            let count = removed.len();
            total += count;

            for (key, value) in &removed {
                self.notify(key, value, RemovalCause::Expired);
            }
            if count < PURGE_BATCH_SIZE {
                return total;
            }
        }
    }
}

// == Cache ==
/// In-process key/value cache with per-entry expiration.
///
/// Clones share the same entries. The background purge task, if any, stops
/// when the last clone is dropped.
///
/// # Expiration
/// Reads never return an entry whose deadline has passed, whether or not the
/// purge task has reclaimed it yet. An entry inserted with a zero duration is
/// expired immediately. [`NO_EXPIRATION`](crate::cache::NO_EXPIRATION) entries
/// live until deleted or evicted.
///
/// # Capacity
/// A `capacity` of 0 means unbounded. Otherwise inserting a new key into a
/// full cache first evicts an already expired entry if one exists, and the
/// least recently used entry if not.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use freshcache::{Cache, NO_EXPIRATION};
///
/// let cache: Cache<String, String> =
///     Cache::new(100, Duration::from_secs(300), NO_EXPIRATION);
/// cache.set("foo".to_string(), "bar".to_string());
/// assert_eq!(cache.get("foo"), Some("bar".to_string()));
/// ```
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
    purge: Option<Arc<PurgeHandle>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            purge: self.purge.clone(),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its purge task.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, 0 for no bound
    /// * `default_expiration` - Lifetime used by [`Cache::set`]
    /// * `cleanup_interval` - Period of the purge task; `NO_EXPIRATION` or a
    ///   zero duration disables it
    ///
    /// If the purge task cannot be started the failure is logged and the
    /// cache relies on lazy expiration alone. Use [`Cache::try_new`] to
    /// handle that case instead.
    pub fn new(
        capacity: usize,
        default_expiration: impl Into<Expiration>,
        cleanup_interval: impl Into<Expiration>,
    ) -> Self {
        let default_expiration = default_expiration.into();
        match Self::try_new(capacity, default_expiration, cleanup_interval) {
            Ok(cache) => cache,
            Err(err) => {
                warn!("Background purge disabled: {}", err);
                Self::with_purge(capacity, default_expiration, None)
            }
        }
    }

    /// Creates a cache, failing if the purge task cannot be started.
    pub fn try_new(
        capacity: usize,
        default_expiration: impl Into<Expiration>,
        cleanup_interval: impl Into<Expiration>,
    ) -> Result<Self> {
        let mut cache = Self::with_purge(capacity, default_expiration.into(), None);

        match cleanup_interval.into().as_interval() {
            Some(interval) => {
                let shared = Arc::downgrade(&cache.shared);
                let handle = spawn_purge_task(interval, move || {
                    shared.upgrade().map(|shared| shared.purge_expired())
                })?;
                cache.purge = Some(Arc::new(handle));
            }
            None => debug!("Background purge disabled, expired entries are only hidden"),
        }

        Ok(cache)
    }

    fn with_purge(
        capacity: usize,
        default_expiration: Expiration,
        purge: Option<Arc<PurgeHandle>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(CacheStore::new(capacity, default_expiration)),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
            purge,
        }
    }

    // == Set ==
    /// Inserts or overwrites `key` with the default expiration.
    pub fn set(&self, key: K, value: V) {
        let evicted = self
            .shared
            .store
            .lock()
            .insert_default(key, value, Instant::now());
        self.after_insert(evicted);
    }

    /// Inserts or overwrites `key` with an explicit expiration.
    ///
    /// `NO_EXPIRATION` keeps the entry until it is deleted or evicted; a zero
    /// duration makes it invisible to the next read.
    pub fn set_with_expire(&self, key: K, value: V, expiration: impl Into<Expiration>) {
        let evicted = self
            .shared
            .store
            .lock()
            .insert(key, value, expiration.into(), Instant::now());
        self.after_insert(evicted);
    }

    fn after_insert(&self, evicted: Option<(K, V, RemovalCause)>) {
        if let Some((key, value, cause)) = evicted {
            debug!("Capacity reached, evicted one entry ({:?})", cause);
            self.shared.notify(&key, &value, cause);
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.lock().get(key, Instant::now())
    }

    /// Returns the value for `key` with its deadline (`None` = never expires).
    pub fn get_with_expiration<Q>(&self, key: &Q) -> Option<(V, Option<Instant>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared
            .store
            .lock()
            .get_with_expiration(key, Instant::now())
    }

    /// Checks for a live entry without counting a hit or miss.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.lock().contains_key(key, Instant::now())
    }

    // == Delete ==
    /// Removes `key`. Does nothing if it is absent.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.shared.store.lock().remove(key);
        if let Some((key, entry)) = removed {
            self.shared.notify(&key, &entry.value, RemovalCause::Deleted);
        }
    }

    /// Removes `key` and returns its value if it was still live.
    pub fn pop<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.shared.store.lock().pop(key, Instant::now());
        let (key, value, cause) = removed?;

        self.shared.notify(&key, &value, cause);
        (cause == RemovalCause::Deleted).then_some(value)
    }

    // == Maintenance ==
    /// Runs one purge pass now. Returns the number of entries removed.
    pub fn delete_expired(&self) -> usize {
        self.shared.purge_expired()
    }

    /// Removes every entry without notifying listeners.
    pub fn flush(&self) {
        self.shared.store.lock().clear();
    }

    /// Registers a callback for entries leaving the cache through deletion,
    /// expiration or capacity eviction. Overwrites and [`Cache::flush`] are
    /// not reported. Callbacks run outside the cache lock.
    ///
    /// The listener stays registered until [`Cache::remove_listener`] is
    /// called with the returned id.
    pub fn on_evicted<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&K, &V, RemovalCause) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Like [`Cache::on_evicted`], but the listener is removed when the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&K, &V, RemovalCause) + Send + Sync + 'static,
    {
        let id = self.on_evicted(listener);
        let shared = Arc::downgrade(&self.shared);
        Subscription {
            id,
            unsubscribe: Some(Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.remove_listener(id);
                }
            })),
        }
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Returns a handle that does not keep the cache alive.
    pub fn downgrade(&self) -> WeakCache<K, V> {
        WeakCache {
            shared: Arc::downgrade(&self.shared),
            purge: self.purge.as_ref().map(Arc::downgrade),
        }
    }

    // == Inspection ==
    /// Keys of all live entries.
    pub fn keys(&self) -> Vec<K> {
        self.shared.store.lock().keys(Instant::now())
    }

    /// Copy of all live entries.
    pub fn items(&self) -> HashMap<K, V> {
        self.shared.store.lock().items(Instant::now())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.shared.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.store.lock().stats()
    }

    pub fn capacity(&self) -> usize {
        self.shared.store.lock().capacity()
    }

    pub fn default_expiration(&self) -> Expiration {
        self.shared.store.lock().default_expiration()
    }

    /// Returns true while a background purge task is running for this cache.
    pub fn is_purging(&self) -> bool {
        self.purge
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

// == Subscription ==
/// Keeps a listener registered; unregisters it when dropped.
pub struct Subscription {
    id: ListenerId,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// == Weak Cache ==
/// Non-owning handle to a [`Cache`], obtained from [`Cache::downgrade`].
pub struct WeakCache<K, V> {
    shared: Weak<Shared<K, V>>,
    purge: Option<Weak<PurgeHandle>>,
}

impl<K, V> Clone for WeakCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            purge: self.purge.clone(),
        }
    }
}

impl<K, V> WeakCache<K, V> {
    /// Returns the cache if any strong handle to it still exists.
    pub fn upgrade(&self) -> Option<Cache<K, V>> {
        let shared = self.shared.upgrade()?;
        let purge = match &self.purge {
            Some(purge) => Some(purge.upgrade()?),
            None => None,
        };
        Some(Cache { shared, purge })
    }
}

impl<K> Cache<K, AnyValue>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Returns the value for `key` if it is live and holds a `T`.
    pub fn get_as<T, Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key)?.downcast::<T>().ok()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("purging", &self.purge.is_some())
            .finish_non_exhaustive()
    }
}
