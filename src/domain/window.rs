//! Sliding window arithmetic.
//!
//! Timestamps are whole Unix seconds. An event counts toward the window while
//! its timestamp is at or after the window cutoff; anything strictly before
//! the cutoff is expired.

use std::time::Duration;

/// Event timestamp in whole Unix seconds (UTC).
pub type Timestamp = i64;

/// Length of the trailing window every counted event belongs to.
pub const WINDOW_LENGTH: Duration = Duration::from_secs(60);

/// Fixed-length trailing time window.
///
/// # Example
/// ```
/// use window_counter::SlidingWindow;
///
/// let window = SlidingWindow::one_minute();
/// assert_eq!(window.cutoff(1_000), 940);
/// assert!(window.contains(1_000, 940));
/// assert!(!window.contains(1_000, 939));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
    length_secs: i64,
}

impl SlidingWindow {
    /// The one-minute window used for request counting.
    pub const fn one_minute() -> Self {
        Self {
            length_secs: WINDOW_LENGTH.as_secs() as i64,
        }
    }

    /// Length of the window.
    pub fn length(&self) -> Duration {
        Duration::from_secs(self.length_secs.unsigned_abs())
    }

    /// Oldest timestamp still inside the window at `now`.
    ///
    /// Everything strictly less than the returned value has expired.
    pub fn cutoff(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.length_secs)
    }

    /// Whether `timestamp` still counts toward the window at `now`.
    pub fn contains(&self, now: Timestamp, timestamp: Timestamp) -> bool {
        timestamp >= self.cutoff(now)
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::one_minute()
    }
}
