//! Concurrency-safe queue of event timestamps.
//!
//! The queue is the only shared mutable state in the counter. Request
//! handlers append to it, the eviction scheduler trims its front, and the
//! snapshot store fills it at startup and drains it to disk at shutdown.
//!
//! ## Ordering precondition
//!
//! Entries are expected to arrive in chronological order (every request
//! records "now"). Eviction relies on this: it only removes the expired
//! prefix, which keeps its cost proportional to the number of entries
//! removed. An expired entry sitting behind a newer one stays in the queue
//! until everything before it expires. `enqueue` never rejects such an entry;
//! it records the violation in [`Metrics::out_of_order`] instead.

use crate::application::metrics::Metrics;
use crate::domain::snapshot::{self, LoadReport, MalformedLinePolicy, SnapshotError};
use crate::domain::window::Timestamp;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered sequence of event timestamps guarded by a single lock.
///
/// Every operation takes the same lock. `load` and `store` hold it for the
/// whole transfer, so they must only run while no traffic is being counted.
///
/// # Example
/// ```
/// use window_counter::TimestampQueue;
///
/// let queue = TimestampQueue::new();
/// for ts in [100, 101, 102, 200] {
///     queue.enqueue(ts);
/// }
///
/// assert_eq!(queue.evict(150), 3);
/// assert_eq!(queue.timestamps(), vec![200]);
/// ```
#[derive(Debug, Default)]
pub struct TimestampQueue {
    timestamps: Mutex<VecDeque<Timestamp>>,
    metrics: Metrics,
}

impl TimestampQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue reporting into existing metrics.
    pub fn with_metrics(metrics: Metrics) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::new()),
            metrics,
        }
    }

    /// Metrics for this queue.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // A panic while holding the lock cannot leave a half-updated sequence of
    // integers behind, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Timestamp>> {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a timestamp to the end of the queue.
    pub fn enqueue(&self, timestamp: Timestamp) {
        let mut timestamps = self.lock();

        if let Some(&tail) = timestamps.back() {
            if timestamp < tail {
                self.metrics.record_out_of_order();
                tracing::debug!(timestamp, tail, "timestamp enqueued out of order");
            }
        }

        timestamps.push_back(timestamp);
        self.metrics.record_enqueued();
    }

    /// Current number of timestamps.
    pub fn size(&self) -> i64 {
        i64::try_from(self.len()).unwrap_or(i64::MAX)
    }

    /// Current number of timestamps as a `usize`.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove the leading timestamps strictly older than `before`.
    ///
    /// Stops at the first timestamp `>= before`. Returns the number removed.
    pub fn evict(&self, before: Timestamp) -> usize {
        let mut timestamps = self.lock();
        let mut evicted = 0;

        while let Some(&oldest) = timestamps.front() {
            if oldest < before {
                timestamps.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }

        if evicted > 0 {
            self.metrics.record_evicted(evicted);
        }
        evicted
    }

    /// Append every timestamp read from `source`.
    ///
    /// The lock is held for the whole read. If decoding fails nothing is
    /// appended. Loaded entries go through the same ordering check as
    /// `enqueue`, starting from the current tail.
    pub fn load<R: BufRead>(
        &self,
        source: R,
        policy: MalformedLinePolicy,
    ) -> Result<LoadReport, SnapshotError> {
        let mut timestamps = self.lock();
        let (loaded, report) = snapshot::decode(source, policy)?;

        let mut tail = timestamps.back().copied();
        for &timestamp in &loaded {
            if let Some(tail) = tail.filter(|&tail| timestamp < tail) {
                self.metrics.record_out_of_order();
                tracing::debug!(timestamp, tail, "timestamp loaded out of order");
            }
            tail = Some(timestamp);
        }

        timestamps.extend(loaded);
        self.metrics.record_loaded(report.loaded);
        Ok(report)
    }

    /// Write every timestamp to `sink`, in order, one per line.
    ///
    /// The lock is held until the output has been flushed. Returns the number
    /// of timestamps written.
    pub fn store<W: Write>(&self, sink: W) -> Result<usize, SnapshotError> {
        let timestamps = self.lock();
        snapshot::encode(sink, timestamps.iter())
    }

    /// Copy of the current contents, oldest first.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.lock().iter().copied().collect()
    }

    /// Whether the contents are in non-decreasing order.
    pub fn is_monotonic(&self) -> bool {
        let timestamps = self.lock();
        timestamps
            .iter()
            .zip(timestamps.iter().skip(1))
            .all(|(earlier, later)| earlier <= later)
    }

    /// Remove every timestamp.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
