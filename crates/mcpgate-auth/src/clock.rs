//! Time source for expiry checks.
//!
//! Claim validation reads the current time through [`Clock`] so tests can pin
//! it at exact boundaries.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current-time provider
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time
    fn now(&self) -> SystemTime;
}

/// The real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to, at whole-second resolution
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    unix_secs: Arc<AtomicU64>,
}

impl FixedClock {
    /// A clock frozen at the given Unix timestamp
    pub fn at_unix(secs: u64) -> Self {
        Self {
            unix_secs: Arc::new(AtomicU64::new(secs)),
        }
    }

    /// Move the clock to a new Unix timestamp
    pub fn set_unix(&self, secs: u64) {
        self.unix_secs.store(secs, Ordering::SeqCst);
    }

    /// Advance the clock
    pub fn advance(&self, by: Duration) {
        self.unix_secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// Current reading as a Unix timestamp
    pub fn unix_secs(&self) -> u64 {
        self.unix_secs.load(Ordering::SeqCst)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.unix_secs())
    }
}
