//! Time provider abstraction
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing production code to use real system time while tests can move time
//! forward by hand to exercise session expiry.
//!
//! # Example
//!
//! ```
//! use watcher::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let millis = clock.now_millis();
//! assert!(clock.now_secs() > 0);
//! # let _ = millis;
//! ```

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Get current time as seconds since Unix epoch.
    fn now_secs(&self) -> i64 {
        (self.now_millis() / 1000) as i64
    }

    /// Unix-millisecond timestamp `ttl` from now.
    fn deadline_millis(&self, ttl: Duration) -> u64 {
        self.now_millis()
            .saturating_add(ttl.as_millis().min(u64::MAX as u128) as u64)
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually driven clock.
///
/// Time only moves when [`ManualClock::advance`] or [`ManualClock::set`] is
/// called, so TTL boundaries can be hit exactly.
///
/// ```
/// use std::time::Duration;
/// use watcher::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1000);
/// assert_eq!(clock.now_millis(), 1000);
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now_millis(), 1500);
/// ```
pub struct ManualClock {
    millis: Mutex<u64>,
}

impl ManualClock {
    /// Create a new clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Advance the clock.
    pub fn advance(&self, by: Duration) {
        let mut millis = self.millis.lock().unwrap_or_else(|e| e.into_inner());
        *millis = millis.saturating_add(by.as_millis() as u64);
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        *self.millis.lock().unwrap_or_else(|e| e.into_inner()) = ms;
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        *self.millis.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

impl Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualClock")
            .field("millis", &self.now_millis())
            .finish()
    }
}
