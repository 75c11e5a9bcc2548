//! Expiration Module
//!
//! Defines how long an entry lives and the `NO_EXPIRATION` sentinel.

use std::time::Duration;

use tokio::time::Instant;

// == Expiration ==
/// Lifetime of a cache entry, or period of the purge cycle.
///
/// A zero duration is valid and means "already expired": an entry inserted
/// with `Expiration::After(Duration::ZERO)` is invisible to the next read.
/// Used as a cleanup interval, both `Never` and a zero duration disable the
/// background purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// The entry never expires by time
    Never,
    /// The entry expires once this much time has elapsed since insertion
    After(Duration),
}

/// Sentinel accepted wherever an expiration is expected: never expire.
pub const NO_EXPIRATION: Expiration = Expiration::Never;

impl Expiration {
    // == Deadline ==
    /// Returns the absolute deadline for an entry inserted at `now`.
    ///
    /// Durations too large to represent as an instant saturate to `None`.
    pub fn deadline_from(self, now: Instant) -> Option<Instant> {
        match self {
            Expiration::Never => None,
            Expiration::After(ttl) => now.checked_add(ttl),
        }
    }

    // == Interval ==
    /// Returns the period to run a repeating task at, or `None` when the
    /// expiration does not describe a usable (non-zero, finite) period.
    pub fn as_interval(self) -> Option<Duration> {
        match self {
            Expiration::After(period) if !period.is_zero() => Some(period),
            _ => None,
        }
    }

    pub fn is_never(self) -> bool {
        matches!(self, Expiration::Never)
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

impl From<Option<Duration>> for Expiration {
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map_or(Expiration::Never, Expiration::After)
    }
}
