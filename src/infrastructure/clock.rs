//! Clock adapters for time operations.
//!
//! Provides SystemClock implementation for production use.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a controllable test clock.
//! Available with the `test-helpers` feature or in test builds:
//!
//! ```toml
//! [dev-dependencies]
//! window-counter = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::{Clock, ClockError};
use crate::domain::window::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// System clock reading wall-clock UTC time in whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::BeforeEpoch)?;
        Timestamp::try_from(elapsed.as_secs()).map_err(|_| ClockError::OutOfRange)
    }
}
