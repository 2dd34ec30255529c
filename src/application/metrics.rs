//! Observability metrics for the timestamp queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking queue activity.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Timestamps appended by `enqueue`
    recorded: AtomicU64,
    /// Timestamps removed by eviction
    evicted: AtomicU64,
    /// Timestamps appended from a snapshot
    loaded: AtomicU64,
    /// Enqueues whose timestamp was older than the tail at the time
    out_of_order: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                recorded: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
                loaded: AtomicU64::new(0),
                out_of_order: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_enqueued(&self) {
        self.inner.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.inner
            .evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_loaded(&self, count: usize) {
        self.inner.loaded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_out_of_order(&self) {
        self.inner.out_of_order.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of timestamps enqueued.
    pub fn recorded(&self) -> u64 {
        self.inner.recorded.load(Ordering::Relaxed)
    }

    /// Total number of timestamps evicted.
    pub fn evicted(&self) -> u64 {
        self.inner.evicted.load(Ordering::Relaxed)
    }

    /// Total number of timestamps loaded from snapshots.
    pub fn loaded(&self) -> u64 {
        self.inner.loaded.load(Ordering::Relaxed)
    }

    /// Number of enqueues that broke chronological order.
    pub fn out_of_order(&self) -> u64 {
        self.inner.out_of_order.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            recorded: self.recorded(),
            evicted: self.evicted(),
            loaded: self.loaded(),
            out_of_order: self.out_of_order(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.recorded.store(0, Ordering::Relaxed);
        self.inner.evicted.store(0, Ordering::Relaxed);
        self.inner.loaded.store(0, Ordering::Relaxed);
        self.inner.out_of_order.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub recorded: u64,
    pub evicted: u64,
    pub loaded: u64,
    pub out_of_order: u64,
}

impl MetricsSnapshot {
    /// Timestamps that entered the queue and have not been evicted yet.
    ///
    /// Matches the queue size as long as nothing else removed entries.
    pub fn retained(&self) -> u64 {
        self.recorded
            .saturating_add(self.loaded)
            .saturating_sub(self.evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.recorded(), 0);
        assert_eq!(metrics.evicted(), 0);
        assert_eq!(metrics.loaded(), 0);
        assert_eq!(metrics.out_of_order(), 0);
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = Metrics::new();

        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_loaded(4);
        metrics.record_evicted(5);
        metrics.record_out_of_order();

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                recorded: 3,
                evicted: 5,
                loaded: 4,
                out_of_order: 1,
            }
        );
        assert_eq!(snapshot.retained(), 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();

        clone.record_enqueued();
        assert_eq!(metrics.recorded(), 1);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_enqueued();
        metrics.record_evicted(2);

        metrics.reset();
        assert_eq!(metrics.snapshot().recorded, 0);
        assert_eq!(metrics.snapshot().evicted, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_enqueued();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.recorded(), 8000);
    }
}
