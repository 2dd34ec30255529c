//! Request counting over the sliding window.

use crate::application::ports::{Clock, ClockError, RequestCounter};
use crate::application::queue::TimestampQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Number of requests seen in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCount {
    pub count: i64,
}

/// Error returned when a request cannot be counted.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The current time could not be read; nothing was recorded.
    #[error("cannot read the current time: {0}")]
    Clock(#[from] ClockError),
}

/// Counts requests by reading the queue size and then recording "now".
///
/// The read and the append take the queue lock separately. Two requests
/// arriving together can therefore both observe the same count before either
/// is recorded. The count is approximate in that window and is left that way.
#[derive(Debug, Clone)]
pub struct CounterService {
    queue: Arc<TimestampQueue>,
    clock: Arc<dyn Clock>,
}

impl CounterService {
    /// Create a service over a shared queue.
    pub fn new(queue: Arc<TimestampQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    /// Requests in the current window, not counting this one, then record
    /// this request.
    ///
    /// # Errors
    /// Returns `CounterError::Clock` if the current time is unavailable. The
    /// queue is left untouched in that case.
    pub fn current_count(&self) -> Result<RequestCount, CounterError> {
        let now = self.clock.now()?;

        let count = self.queue.size();
        self.queue.enqueue(now);

        Ok(RequestCount { count })
    }

    /// The queue this service records into.
    pub fn queue(&self) -> &Arc<TimestampQueue> {
        &self.queue
    }
}

impl RequestCounter for CounterService {
    fn request_count(&self) -> Result<RequestCount, CounterError> {
        self.current_count()
    }
}
