//! Mock clock for testing.

use crate::application::ports::{Clock, ClockError};
use crate::domain::window::Timestamp;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of counting and eviction.
///
/// # Examples
///
/// ```
/// use window_counter::infrastructure::mocks::MockClock;
/// use window_counter::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(1_700_000_000);
/// assert_eq!(clock.now().unwrap(), 1_700_000_000);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now().unwrap(), 1_700_000_010);
///
/// clock.set(42);
/// assert_eq!(clock.now().unwrap(), 42);
///
/// clock.fail();
/// assert!(clock.now().is_err());
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    // `None` while the clock is failing.
    current_time: Arc<Mutex<Option<Timestamp>>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific Unix second.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Some(start))),
        }
    }

    /// Advance the clock by a duration, truncated to whole seconds.
    pub fn advance(&self, duration: Duration) {
        self.advance_secs(duration.as_secs());
    }

    /// Advance the clock by a number of seconds.
    ///
    /// Has no effect while the clock is failing.
    pub fn advance_secs(&self, secs: u64) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        if let Some(now) = time.as_mut() {
            *now = now.saturating_add_unsigned(secs);
        }
    }

    /// Set the clock to a specific Unix second, clearing any failure.
    pub fn set(&self, timestamp: Timestamp) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = Some(timestamp);
    }

    /// Make every subsequent `now()` fail until `set` is called.
    pub fn fail(&self) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = None;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        self.current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
            .ok_or(ClockError::BeforeEpoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock() {
        let clock = MockClock::new(100);
        assert_eq!(clock.now(), Ok(100));

        clock.advance_secs(10);
        assert_eq!(clock.now(), Ok(110));

        clock.set(5);
        assert_eq!(clock.now(), Ok(5));
    }

    #[test]
    fn test_mock_clock_failure_and_recovery() {
        let clock = MockClock::new(100);
        clock.fail();
        assert_eq!(clock.now(), Err(ClockError::BeforeEpoch));

        clock.advance_secs(10);
        assert_eq!(clock.now(), Err(ClockError::BeforeEpoch));

        clock.set(200);
        assert_eq!(clock.now(), Ok(200));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = MockClock::new(0);
        let clone = clock.clone();

        clone.advance(Duration::from_millis(2_500));
        assert_eq!(clock.now(), Ok(2));
    }
}
