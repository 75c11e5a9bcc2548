//! freshcache - A generic in-process cache
//!
//! Provides a key/value cache with per-entry TTL expiration, a background
//! purge task, and proxies that reach cached values through a secondary key.

pub mod cache;
pub mod config;
pub mod error;
pub mod proxy;
pub mod tasks;

pub use cache::{
    AnyCache, AnyValue, Cache, CacheStats, Expiration, ListenerId, RemovalCause, Subscription,
    WeakCache, NO_EXPIRATION,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use proxy::Proxy;
