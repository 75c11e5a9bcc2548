//! Proxy Module
//!
//! Secondary-key access to a [`Cache`](crate::cache::Cache): a proxy maps each
//! secondary key to a primary key and reads and writes through the cache.

mod secondary;

pub use secondary::Proxy;
