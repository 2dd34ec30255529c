//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::application::counter::{CounterError, RequestCount};
use crate::application::queue::TimestampQueue;
use crate::domain::snapshot::{LoadReport, SnapshotError};
use crate::domain::window::Timestamp;
use std::fmt::Debug;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned when the current time cannot be expressed as a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The system clock reports a time before 1970-01-01T00:00:00Z.
    #[error("system clock is set before the Unix epoch")]
    BeforeEpoch,
    /// The number of seconds does not fit in a signed 64-bit timestamp.
    #[error("system clock is out of range for a 64-bit timestamp")]
    OutOfRange,
}

/// Port for obtaining the current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Current time in whole Unix seconds (UTC).
    fn now(&self) -> Result<Timestamp, ClockError>;
}

/// Error returned by a [`SnapshotStore`].
///
/// Every variant names the resource and carries the underlying failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The snapshot could not be opened or created.
    #[error("cannot open snapshot {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The snapshot could not be read or decoded into the queue.
    #[error("cannot load snapshot {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// The snapshot was loaded but could not be cleared afterwards.
    #[error("cannot truncate snapshot {}: {source}", path.display())]
    Truncate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The queue could not be written to the snapshot.
    #[error("cannot write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// Written data could not be synced to the device.
    #[error("cannot sync snapshot {}: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temporary snapshot could not be moved into place.
    #[error("cannot replace snapshot {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Port mapping a durable resource to the queue's load and store operations.
///
/// `load_into` consumes the snapshot: once it succeeds the resource is empty,
/// so calling it again is a no-op. Implementations must only be invoked while
/// no counting traffic is running.
pub trait SnapshotStore: Send + Sync + Debug {
    /// Append the persisted timestamps to `queue`, then clear the resource.
    fn load_into(&self, queue: &TimestampQueue) -> Result<LoadReport, PersistenceError>;

    /// Write the whole queue to the resource.
    ///
    /// Returns the number of timestamps written.
    fn store_from(&self, queue: &TimestampQueue) -> Result<usize, PersistenceError>;
}

/// Port consumed by transports that expose the request count.
pub trait RequestCounter: Send + Sync {
    /// Count of requests in the current window, excluding this one, and
    /// record this request.
    fn request_count(&self) -> Result<RequestCount, CounterError>;
}
