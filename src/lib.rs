//! # window-counter
//!
//! Concurrent sliding-window request counter with snapshot persistence.
//!
//! Every counted request records its arrival time (Unix seconds) in a shared
//! queue. A background task evicts everything older than one minute, so the
//! queue length is the number of requests seen in the last minute. The queue
//! survives restarts through a plain text snapshot that is loaded once at
//! startup and written once at shutdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use window_counter::{
//!     CounterService, EvictionConfig, EvictionScheduler, SystemClock, TimestampQueue,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Arc::new(TimestampQueue::new());
//! let clock = Arc::new(SystemClock::new());
//!
//! let scheduler = EvictionScheduler::new(
//!     Arc::clone(&queue),
//!     clock.clone(),
//!     EvictionConfig::default(),
//! )
//! .start();
//!
//! let counter = CounterService::new(Arc::clone(&queue), clock);
//! let seen = counter.current_count()?;
//! println!("requests in the last minute before this one: {}", seen.count);
//!
//! scheduler.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence
//!
//! ```rust,no_run
//! use window_counter::{FileSnapshot, SnapshotConfig, SnapshotStore, TimestampQueue, WriteMode};
//!
//! # fn run() -> Result<(), window_counter::PersistenceError> {
//! let snapshot = FileSnapshot::new(
//!     SnapshotConfig::new("./resources/tmp/storage.txt")
//!         .with_create_if_missing(true)
//!         .with_write_mode(WriteMode::AtomicReplace),
//! );
//!
//! let queue = TimestampQueue::new();
//! let report = snapshot.load_into(&queue)?;  // the file is emptied afterwards
//! println!("restored {} timestamps", report.loaded);
//!
//! snapshot.store_from(&queue)?;
//! # Ok(())
//! # }
//! ```
//!
//! The snapshot holds one decimal timestamp per line. Lines that are not
//! timestamps are skipped with a warning by default; use
//! [`MalformedLinePolicy::Reject`] to refuse the whole file instead.
//!
//! ## Ordering
//!
//! Eviction removes only the expired prefix of the queue, which keeps each
//! pass proportional to the number of entries removed. This relies on
//! timestamps being enqueued in chronological order. An out-of-order entry is
//! still accepted and counted in [`Metrics::out_of_order`].
//!
//! ## Server
//!
//! With the default `server` feature the crate ships an axum transport
//! (`GET /counter`, `GET /health-check`) and the `window-counter` binary,
//! configured through `COUNTER_*` environment variables (see [`config`]).

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Process configuration
pub mod config;

// Re-export commonly used types for convenience
pub use domain::{
    snapshot::{LoadReport, MalformedLinePolicy, SnapshotError},
    window::{SlidingWindow, Timestamp, WINDOW_LENGTH},
};

pub use application::{
    counter::{CounterError, CounterService, RequestCount},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, ClockError, PersistenceError, RequestCounter, SnapshotStore},
    queue::TimestampQueue,
    scheduler::{
        EvictionConfig, EvictionConfigError, EvictionScheduler, SchedulerHandle, ShutdownError,
    },
};

pub use config::{ConfigError, ServerConfig};

pub use infrastructure::{
    clock::SystemClock,
    file_snapshot::{FileSnapshot, SnapshotConfig, WriteMode},
};

#[cfg(feature = "server")]
pub use infrastructure::app::{CounterApp, ShutdownReport, StartupError};
