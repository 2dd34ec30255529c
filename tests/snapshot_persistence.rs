//! Integration tests for snapshot persistence across restarts.

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use window_counter::infrastructure::mocks::{MockCaptureLayer, MockClock};
use window_counter::{
    CounterService, FileSnapshot, MalformedLinePolicy, PersistenceError, SnapshotConfig,
    SnapshotStore, TimestampQueue, WriteMode,
};

fn file_snapshot(dir: &TempDir, mode: WriteMode) -> FileSnapshot {
    FileSnapshot::new(
        SnapshotConfig::new(dir.path().join("storage.txt"))
            .with_create_if_missing(true)
            .with_write_mode(mode),
    )
}

#[test]
fn test_state_survives_restart() {
    for mode in [WriteMode::InPlace, WriteMode::AtomicReplace] {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new(1_700_000_000);

        // First run: count a few requests and store on shutdown.
        let first = Arc::new(TimestampQueue::new());
        let snapshot = file_snapshot(&dir, mode);
        snapshot.load_into(&first).unwrap();
        let service = CounterService::new(Arc::clone(&first), Arc::new(clock.clone()));
        for _ in 0..3 {
            service.current_count().unwrap();
            clock.advance_secs(1);
        }
        assert_eq!(snapshot.store_from(&first).unwrap(), 3);

        // Second run picks up where the first stopped.
        let second = Arc::new(TimestampQueue::new());
        let report = file_snapshot(&dir, mode).load_into(&second).unwrap();
        let service = CounterService::new(Arc::clone(&second), Arc::new(clock.clone()));

        assert_eq!(report.loaded, 3);
        assert_eq!(second.timestamps(), first.timestamps());
        assert_eq!(service.current_count().unwrap().count, 3);
    }
}

#[test]
fn test_snapshot_consumed_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.txt");
    fs::write(&path, "1700000000\n1700000001\n").unwrap();
    let snapshot = FileSnapshot::new(SnapshotConfig::new(&path));

    let first = TimestampQueue::new();
    snapshot.load_into(&first).unwrap();

    // A retried startup must not count the same events again.
    let retried = TimestampQueue::new();
    let report = snapshot.load_into(&retried).unwrap();

    assert_eq!(first.size(), 2);
    assert_eq!(report.loaded, 0);
    assert!(retried.is_empty());
}

#[test]
fn test_store_empty_queue_writes_empty_file() {
    let dir = TempDir::new().unwrap();
    let snapshot = file_snapshot(&dir, WriteMode::InPlace);
    let queue = TimestampQueue::new();
    snapshot.load_into(&queue).unwrap();

    assert_eq!(snapshot.store_from(&queue).unwrap(), 0);
    assert_eq!(fs::read_to_string(snapshot.path()).unwrap(), "");
}

#[test]
fn test_malformed_lines_skipped_with_warning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.txt");
    fs::write(&path, "100\n\nnot-a-number\n  101  \n102\n").unwrap();
    let snapshot = FileSnapshot::new(SnapshotConfig::new(&path));
    let queue = TimestampQueue::new();

    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let report = tracing::subscriber::with_default(subscriber, || snapshot.load_into(&queue))
        .unwrap();

    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(queue.timestamps(), vec![100, 101, 102]);
    assert!(capture.contains(Level::WARN, "skipping malformed snapshot line"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_malformed_lines_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.txt");
    fs::write(&path, "100\nnot-a-number\n102\n").unwrap();
    let snapshot = FileSnapshot::new(
        SnapshotConfig::new(&path).with_malformed_lines(MalformedLinePolicy::Reject),
    );
    let queue = TimestampQueue::new();

    let result = snapshot.load_into(&queue);

    assert!(matches!(result, Err(PersistenceError::Load { .. })));
    assert!(queue.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), "100\nnot-a-number\n102\n");
}

#[test]
fn test_errors_name_the_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.txt");
    let snapshot = FileSnapshot::new(SnapshotConfig::new(&path));

    let err = snapshot.load_into(&TimestampQueue::new()).unwrap_err();

    assert!(err.to_string().contains("missing.txt"));
    assert!(std::error::Error::source(&err).is_some());
}
