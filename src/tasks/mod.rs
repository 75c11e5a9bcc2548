//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of a cache.
//!
//! # Tasks
//! - Purge: Removes expired cache entries at the configured interval

mod cleanup;

pub use cleanup::{spawn_purge_task, PurgeHandle};
