//! Error types for the cache
//!
//! Cache operations themselves cannot fail; these errors cover setup:
//! reading configuration and starting the background purge task.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache setup.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A configuration value could not be parsed
    #[error("Invalid configuration: {var}={value:?}")]
    InvalidConfig { var: &'static str, value: String },

    /// The background purge worker could not be started
    #[error("Failed to start purge task: {0}")]
    PurgeTask(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
