use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use window_counter::{CounterApp, ServerConfig, StartupError};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "counter server failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    let app = CounterApp::start(config).await?;

    let report = app.run_until_signal().await;
    if !report.is_clean() {
        tracing::warn!(?report, "shutdown completed with errors");
    }
    Ok(())
}
