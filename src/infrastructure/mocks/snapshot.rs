//! In-memory snapshot store for testing.

use crate::application::ports::{PersistenceError, SnapshotStore};
use crate::application::queue::TimestampQueue;
use crate::domain::snapshot::{LoadReport, MalformedLinePolicy};
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Snapshot store keeping its bytes in memory.
///
/// Behaves like the file adapter: a successful load clears the contents.
/// Stores can be made to fail to exercise shutdown error paths. Clones share
/// the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    contents: Arc<Mutex<Vec<u8>>>,
    fail_stores: Arc<AtomicBool>,
    stores: Arc<AtomicUsize>,
    policy: MalformedLinePolicy,
}

impl MemorySnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot holding `contents`.
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        let snapshot = Self::default();
        *snapshot.lock() = contents.into();
        snapshot
    }

    /// Use `policy` for malformed lines.
    pub fn with_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make every subsequent store fail.
    pub fn fail_stores(&self) {
        self.fail_stores.store(true, Ordering::SeqCst);
    }

    /// Current contents as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Number of store attempts so far, failed ones included.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.contents
            .lock()
            .expect("MemorySnapshot mutex poisoned - a test thread panicked while holding the lock")
    }

    fn path() -> PathBuf {
        PathBuf::from("memory")
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load_into(&self, queue: &TimestampQueue) -> Result<LoadReport, PersistenceError> {
        let mut contents = self.lock();
        let report = queue
            .load(Cursor::new(contents.as_slice()), self.policy)
            .map_err(|source| PersistenceError::Load {
                path: Self::path(),
                source,
            })?;
        contents.clear();
        Ok(report)
    }

    fn store_from(&self, queue: &TimestampQueue) -> Result<usize, PersistenceError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(PersistenceError::Open {
                path: Self::path(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "store disabled"),
            });
        }

        let mut buffer = Vec::new();
        let written = queue
            .store(&mut buffer)
            .map_err(|source| PersistenceError::Write {
                path: Self::path(),
                source,
            })?;
        *self.lock() = buffer;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_consumes_contents() {
        let snapshot = MemorySnapshot::with_contents("1\n2\n");
        let queue = TimestampQueue::new();

        let report = snapshot.load_into(&queue).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(snapshot.contents(), "");

        snapshot.load_into(&queue).unwrap();
        assert_eq!(queue.timestamps(), vec![1, 2]);
    }

    #[test]
    fn test_failing_store() {
        let snapshot = MemorySnapshot::new();
        snapshot.fail_stores();

        let result = snapshot.store_from(&TimestampQueue::new());
        assert!(matches!(result, Err(PersistenceError::Open { .. })));
        assert_eq!(snapshot.store_count(), 1);
    }
}
