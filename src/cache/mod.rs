//! Cache Module
//!
//! Provides generic in-memory caching with TTL expiration and capacity-bounded LRU eviction.

mod entry;
mod expiration;
mod expiry;
mod handle;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use expiration::{Expiration, NO_EXPIRATION};
pub use expiry::ExpiryQueue;
pub use handle::{
    AnyCache, AnyValue, Cache, EvictionListener, ListenerId, Subscription, WeakCache,
};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, RemovalCause};

// == Public Constants ==
/// Maximum number of expired entries removed per lock acquisition during a purge
pub const PURGE_BATCH_SIZE: usize = 256;
