//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use tokio::time::Instant;

use crate::cache::Expiration;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Absolute expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Insertion sequence number, unique per store
    pub(crate) seq: u64,
    /// Recency tick of the last read or write
    pub(crate) last_used: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring according to `expiration`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expiration` - Lifetime of the entry, measured from `now`
    /// * `now` - Insertion instant
    /// * `seq` - Sequence number assigned by the owning store
    pub fn new(value: V, expiration: Expiration, now: Instant, seq: u64) -> Self {
        Self {
            value,
            expires_at: expiration.deadline_from(now),
            seq,
            last_used: seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is live only while `now` is strictly
    /// before its deadline, so a zero TTL is expired at insertion time.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired as of the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now: Instant) -> Option<std::time::Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}
