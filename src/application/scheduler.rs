//! Periodic eviction of expired timestamps.
//!
//! A background task wakes up on a fixed interval, computes the window cutoff
//! from the clock and evicts everything before it. Concurrent inserts are
//! handled entirely by the queue lock; the scheduler keeps no state of its
//! own and never retries. A missed tick is simply skipped.

use crate::application::ports::Clock;
use crate::application::queue::TimestampQueue;
use crate::domain::window::SlidingWindow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};

/// Default time between eviction passes.
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_millis(100);

/// Error returned when eviction configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvictionConfigError {
    /// Eviction interval duration must be greater than zero
    #[error("eviction interval must be greater than 0")]
    ZeroInterval,
}

/// Configuration for the eviction scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionConfig {
    /// How often to evict
    pub interval: Duration,
    /// Window entries must fall into to survive a pass
    pub window: SlidingWindow,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_EVICTION_INTERVAL,
            window: SlidingWindow::one_minute(),
        }
    }
}

impl EvictionConfig {
    /// Create a new eviction config with the specified interval.
    ///
    /// # Errors
    /// Returns `EvictionConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, EvictionConfigError> {
        if interval.is_zero() {
            return Err(EvictionConfigError::ZeroInterval);
        }
        Ok(Self {
            interval,
            window: SlidingWindow::one_minute(),
        })
    }
}

/// Error returned when the eviction task does not stop cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The task panicked or was cancelled before it could stop.
    #[error("eviction task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// Evicts expired timestamps from a shared queue.
#[derive(Debug)]
pub struct EvictionScheduler {
    queue: Arc<TimestampQueue>,
    clock: Arc<dyn Clock>,
    config: EvictionConfig,
}

impl EvictionScheduler {
    /// Create a new scheduler.
    pub fn new(
        queue: Arc<TimestampQueue>,
        clock: Arc<dyn Clock>,
        config: EvictionConfig,
    ) -> Self {
        Self {
            queue,
            clock,
            config,
        }
    }

    /// Run a single eviction pass.
    ///
    /// Returns the number of timestamps evicted. A clock failure skips the
    /// pass; the next one tries again.
    pub fn run_once(&self) -> usize {
        let now = match self.clock.now() {
            Ok(now) => now,
            Err(e) => {
                tracing::warn!(error = %e, "skipping eviction pass");
                return 0;
            }
        };

        let cutoff = self.config.window.cutoff(now);
        let evicted = self.queue.evict(cutoff);
        if evicted > 0 {
            tracing::trace!(evicted, cutoff, "evicted expired timestamps");
        }
        evicted
    }

    /// Spawn the eviction loop on the current tokio runtime.
    ///
    /// The task runs until [`SchedulerHandle::shutdown`] is called. Dropping
    /// the handle detaches the task instead of stopping it.
    pub fn start(self) -> SchedulerHandle {
        let stop = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&stop);

        let join = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(
                interval_ms = self.config.interval.as_millis() as u64,
                "eviction scheduler started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = stop_signal.notified() => {
                        tracing::info!("shutting down the eviction scheduler");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                }
            }
        });

        SchedulerHandle { stop, join }
    }

    /// Get the scheduler configuration.
    pub fn config(&self) -> &EvictionConfig {
        &self.config
    }
}

/// Handle to a running eviction task.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Stop the task and wait for it to finish.
    ///
    /// The queue is not flushed; persisting it is the snapshot store's job.
    ///
    /// # Errors
    /// Returns `ShutdownError::TaskFailed` if the task panicked.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        self.stop.notify_one();
        self.join.await?;
        Ok(())
    }
}
