//! Configuration Module
//!
//! Cache construction parameters, loadable from environment variables or
//! embedded in a host application's configuration file via serde.

use std::env;
use std::hash::Hash;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{Cache, Expiration, NO_EXPIRATION};
use crate::error::{CacheError, Result};

const ENV_CAPACITY: &str = "FRESHCACHE_CAPACITY";
const ENV_DEFAULT_TTL: &str = "FRESHCACHE_DEFAULT_TTL";
const ENV_CLEANUP_INTERVAL: &str = "FRESHCACHE_CLEANUP_INTERVAL";

/// Cache configuration parameters.
///
/// Durations are whole seconds. A `default_ttl_secs` of 0 means entries
/// never expire by default; a `cleanup_interval_secs` of 0 disables the
/// background purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries, 0 for no bound
    pub capacity: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl_secs: u64,
    /// Background purge interval in seconds
    pub cleanup_interval_secs: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FRESHCACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `FRESHCACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `FRESHCACHE_CLEANUP_INTERVAL` - Purge frequency in seconds (default: 600)
    ///
    /// Unset variables take their default; set but unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: env_or(ENV_CAPACITY, defaults.capacity)?,
            default_ttl_secs: env_or(ENV_DEFAULT_TTL, defaults.default_ttl_secs)?,
            cleanup_interval_secs: env_or(ENV_CLEANUP_INTERVAL, defaults.cleanup_interval_secs)?,
        })
    }

    pub fn default_expiration(&self) -> Expiration {
        seconds_or_never(self.default_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Expiration {
        seconds_or_never(self.cleanup_interval_secs)
    }

    /// Creates a cache with these parameters.
    pub fn build<K, V>(&self) -> Cache<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Cache::new(
            self.capacity,
            self.default_expiration(),
            self.cleanup_interval(),
        )
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            default_ttl_secs: 300,
            cleanup_interval_secs: 600,
        }
    }
}

fn seconds_or_never(secs: u64) -> Expiration {
    match secs {
        0 => NO_EXPIRATION,
        secs => Expiration::After(Duration::from_secs(secs)),
    }
}

fn env_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| CacheError::InvalidConfig { var, value }),
        Err(_) => Ok(default),
    }
}
