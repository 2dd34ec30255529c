//! File-backed snapshot store.
//!
//! The snapshot file holds the queue between runs. At startup it is read into
//! the queue and then truncated, so each snapshot is consumed exactly once and
//! a repeated or retried startup cannot count the same events twice. At
//! shutdown the whole queue is written back.
//!
//! ## Durability
//!
//! With [`WriteMode::InPlace`] the file is truncated and rewritten in place. A
//! crash during that write can leave a truncated or partial snapshot behind.
//! [`WriteMode::AtomicReplace`] writes a temporary file next to the snapshot,
//! syncs it and renames it over the old one, so readers only ever see the old
//! or the new contents.

use crate::application::ports::{PersistenceError, SnapshotStore};
use crate::application::queue::TimestampQueue;
use crate::domain::snapshot::{LoadReport, MalformedLinePolicy};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// How the snapshot is written at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and rewrite the snapshot file.
    #[default]
    InPlace,
    /// Write a temporary file and rename it over the snapshot.
    AtomicReplace,
}

/// Configuration for [`FileSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Location of the snapshot file
    pub path: PathBuf,
    /// Create an empty snapshot (and its parent directories) when missing
    pub create_if_missing: bool,
    /// What to do with lines that are not timestamps
    pub malformed_lines: MalformedLinePolicy,
    /// How the snapshot is written
    pub write_mode: WriteMode,
}

impl SnapshotConfig {
    /// Configuration for the snapshot at `path`.
    ///
    /// A missing file is an error unless [`with_create_if_missing`] is set.
    ///
    /// [`with_create_if_missing`]: SnapshotConfig::with_create_if_missing
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: false,
            malformed_lines: MalformedLinePolicy::default(),
            write_mode: WriteMode::default(),
        }
    }

    /// Create the snapshot file when it does not exist.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Set the malformed line policy.
    pub fn with_malformed_lines(mut self, policy: MalformedLinePolicy) -> Self {
        self.malformed_lines = policy;
        self
    }

    /// Set the write mode.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

/// Snapshot store persisting the queue to a plain text file.
///
/// # Example
/// ```no_run
/// use window_counter::{FileSnapshot, SnapshotConfig, SnapshotStore, TimestampQueue};
///
/// let snapshot = FileSnapshot::new(
///     SnapshotConfig::new("./resources/tmp/storage.txt").with_create_if_missing(true),
/// );
/// let queue = TimestampQueue::new();
///
/// snapshot.load_into(&queue).expect("startup load failed");
/// // ... serve traffic ...
/// snapshot.store_from(&queue).expect("shutdown store failed");
/// ```
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    config: SnapshotConfig,
}

impl FileSnapshot {
    /// Create a store for the configured file.
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the snapshot configuration.
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    fn open_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Open {
            path: self.config.path.clone(),
            source,
        }
    }

    fn create_empty(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).map_err(|e| self.open_error(e))?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.config.path)
            .map_err(|e| self.open_error(e))?;
        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.config
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    fn store_in_place(&self, queue: &TimestampQueue) -> Result<usize, PersistenceError> {
        let path = &self.config.path;
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(self.config.create_if_missing)
            .open(path)
            .map_err(|e| self.open_error(e))?;

        let written = queue
            .store(&file)
            .map_err(|source| PersistenceError::Write {
                path: path.clone(),
                source,
            })?;

        file.sync_all().map_err(|source| PersistenceError::Sync {
            path: path.clone(),
            source,
        })?;
        Ok(written)
    }

    fn store_atomic(&self, queue: &TimestampQueue) -> Result<usize, PersistenceError> {
        let path = &self.config.path;
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));

        let temp = NamedTempFile::new_in(dir).map_err(|e| self.open_error(e))?;

        let written = queue
            .store(temp.as_file())
            .map_err(|source| PersistenceError::Write {
                path: path.clone(),
                source,
            })?;

        temp.as_file()
            .sync_all()
            .map_err(|source| PersistenceError::Sync {
                path: path.clone(),
                source,
            })?;

        temp.persist(path)
            .map_err(|e| PersistenceError::Replace {
                path: path.clone(),
                source: e.error,
            })?;
        Ok(written)
    }
}

impl SnapshotStore for FileSnapshot {
    fn load_into(&self, queue: &TimestampQueue) -> Result<LoadReport, PersistenceError> {
        let path = &self.config.path;

        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.config.create_if_missing => {
                self.create_empty()?;
                tracing::info!(path = %path.display(), "created empty snapshot");
                return Ok(LoadReport::default());
            }
            Err(e) => return Err(self.open_error(e)),
        };

        let report = queue
            .load(BufReader::new(&file), self.config.malformed_lines)
            .map_err(|source| PersistenceError::Load {
                path: path.clone(),
                source,
            })?;

        consume(&file).map_err(|source| PersistenceError::Truncate {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            "snapshot loaded"
        );
        Ok(report)
    }

    fn store_from(&self, queue: &TimestampQueue) -> Result<usize, PersistenceError> {
        let written = match self.config.write_mode {
            WriteMode::InPlace => self.store_in_place(queue)?,
            WriteMode::AtomicReplace => self.store_atomic(queue)?,
        };

        tracing::info!(
            path = %self.config.path.display(),
            written,
            "snapshot stored"
        );
        Ok(written)
    }
}

/// Empty a loaded snapshot so it cannot be loaded again.
fn consume(file: &File) -> io::Result<()> {
    file.set_len(0)?;
    file.sync_all()
}
