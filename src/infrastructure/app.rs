//! Composition root: wires the queue, the scheduler, the snapshot store and
//! the HTTP transport, and owns their lifecycle.
//!
//! Startup binds the listener, loads the snapshot, starts eviction and only
//! then serves traffic. Shutdown runs the reverse: stop eviction, stop the
//! server within the grace period, then store the queue exactly once.

use crate::application::counter::CounterService;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, PersistenceError, SnapshotStore};
use crate::application::queue::TimestampQueue;
use crate::application::scheduler::{EvictionScheduler, SchedulerHandle};
use crate::config::{ConfigError, ServerConfig};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::file_snapshot::FileSnapshot;
use crate::infrastructure::http;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Error returned when the server cannot start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The snapshot could not be loaded; no traffic was served.
    #[error("cannot restore counter state: {0}")]
    Snapshot(#[from] PersistenceError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Outcome of [`CounterApp::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The eviction task stopped without panicking
    pub scheduler_stopped: bool,
    /// In-flight requests finished within the grace period
    pub drained: bool,
    /// Timestamps written to the snapshot, `None` if the store failed
    pub stored: Option<usize>,
}

impl ShutdownReport {
    /// Whether every shutdown step succeeded.
    pub fn is_clean(&self) -> bool {
        self.scheduler_stopped && self.drained && self.stored.is_some()
    }
}

/// A running counter server.
#[derive(Debug)]
pub struct CounterApp {
    queue: Arc<TimestampQueue>,
    metrics: Metrics,
    snapshot: Arc<dyn SnapshotStore>,
    scheduler: SchedulerHandle,
    server: JoinHandle<io::Result<()>>,
    stop_server: Arc<Notify>,
    local_addr: SocketAddr,
    shutdown_grace: Duration,
}

impl CounterApp {
    /// Start a server using the system clock and the configured snapshot file.
    pub async fn start(config: ServerConfig) -> Result<Self, StartupError> {
        let snapshot = Arc::new(FileSnapshot::new(config.snapshot.clone()));
        Self::start_with(config, Arc::new(SystemClock::new()), snapshot).await
    }

    /// Start a server with explicit clock and snapshot store.
    ///
    /// # Errors
    /// Fails if the listener cannot be bound or the snapshot cannot be
    /// loaded. The snapshot is left untouched when binding fails.
    pub async fn start_with(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        snapshot: Arc<dyn SnapshotStore>,
    ) -> Result<Self, StartupError> {
        let addr = config.bind_addr;
        let bind_error = |source| StartupError::Bind { addr, source };

        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let metrics = Metrics::new();
        let queue = Arc::new(TimestampQueue::with_metrics(metrics.clone()));
        let report = snapshot.load_into(&queue)?;
        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped,
            "counter state restored"
        );

        let scheduler = EvictionScheduler::new(
            Arc::clone(&queue),
            Arc::clone(&clock),
            config.eviction.clone(),
        )
        .start();

        let service = CounterService::new(Arc::clone(&queue), clock);
        let router = http::router(Arc::new(service), &config.health_message);

        let stop_server = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&stop_server);
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop_signal.notified().await })
                .await
        });

        tracing::info!(addr = %local_addr, "counter server listening");

        Ok(Self {
            queue,
            metrics,
            snapshot,
            scheduler,
            server,
            stop_server,
            local_addr,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The shared queue.
    pub fn queue(&self) -> &Arc<TimestampQueue> {
        &self.queue
    }

    /// Counters for the shared queue.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Serve until SIGINT or SIGTERM, then shut down.
    pub async fn run_until_signal(self) -> ShutdownReport {
        shutdown_signal().await;
        self.shutdown().await
    }

    /// Stop eviction, stop serving and store the queue.
    ///
    /// Requests still running when the grace period ends are abandoned. A
    /// failed store is logged and reported, never raised.
    pub async fn shutdown(mut self) -> ShutdownReport {
        let scheduler_stopped = match self.scheduler.shutdown().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "eviction scheduler did not stop cleanly");
                false
            }
        };

        self.stop_server.notify_one();
        let drained = match tokio::time::timeout(self.shutdown_grace, &mut self.server).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                tracing::error!(error = %e, "server failed");
                false
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "server task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = self.shutdown_grace.as_millis() as u64,
                    "grace period elapsed, abandoning in-flight requests"
                );
                self.server.abort();
                false
            }
        };

        let stored = match self.snapshot.store_from(&self.queue) {
            Ok(written) => Some(written),
            Err(e) => {
                tracing::error!(error = %e, "failed to store counter state");
                None
            }
        };

        tracing::info!(
            scheduler_stopped,
            drained,
            metrics = ?self.metrics.snapshot(),
            "counter server stopped"
        );
        ShutdownReport {
            scheduler_stopped,
            drained,
            stored,
        }
    }
}

/// Resolve on SIGINT (ctrl-c) or, on Unix, SIGTERM.
///
/// A signal that cannot be listened for is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::EvictionConfig;
    use crate::infrastructure::file_snapshot::SnapshotConfig;
    use crate::infrastructure::mocks::{MemorySnapshot, MockClock};

    fn local_config() -> ServerConfig {
        ServerConfig::new(
            "127.0.0.1:0".parse().unwrap(),
            SnapshotConfig::new("unused"),
            EvictionConfig::new(Duration::from_millis(10)).unwrap(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_loads_and_shutdown_stores() {
        let snapshot = MemorySnapshot::with_contents("995\n996\n");
        let clock = MockClock::new(1_000);

        let app = CounterApp::start_with(
            local_config(),
            Arc::new(clock),
            Arc::new(snapshot.clone()),
        )
        .await
        .unwrap();

        assert_ne!(app.local_addr().port(), 0);
        assert_eq!(app.queue().timestamps(), vec![995, 996]);
        assert_eq!(app.metrics().loaded(), 2);
        assert_eq!(app.metrics().recorded(), 0);
        assert_eq!(snapshot.contents(), "");

        let report = app.shutdown().await;

        assert!(report.is_clean());
        assert_eq!(report.stored, Some(2));
        assert_eq!(snapshot.contents(), "995\n996\n");
        assert_eq!(snapshot.store_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_fatal() {
        let snapshot = MemorySnapshot::with_contents("1\nnope\n")
            .with_policy(crate::domain::snapshot::MalformedLinePolicy::Reject);

        let result = CounterApp::start_with(
            local_config(),
            Arc::new(MockClock::new(0)),
            Arc::new(snapshot.clone()),
        )
        .await;

        assert!(matches!(result, Err(StartupError::Snapshot(_))));
        assert_eq!(snapshot.contents(), "1\nnope\n");
    }

    #[tokio::test]
    async fn test_failed_store_is_reported() {
        let snapshot = MemorySnapshot::new();
        snapshot.fail_stores();

        let app = CounterApp::start_with(
            local_config(),
            Arc::new(MockClock::new(0)),
            Arc::new(snapshot),
        )
        .await
        .unwrap();

        let report = app.shutdown().await;
        assert_eq!(report.stored, None);
        assert!(report.scheduler_stopped);
        assert!(!report.is_clean());
    }
}
