use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shiftwatch_worker::config::{self, LogFormat, WorkerConfig};
use shiftwatch_worker::Services;

/// How long the in-flight tick may take to wind down after a signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let log_format = config::log_format_from_env()?;
    init_tracing(log_format);

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        regions = ?config.csr.regions,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = shiftwatch_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    shiftwatch_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    shiftwatch_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Services ---
    let services = Services::build(&config, pool)?;

    let cancel = CancellationToken::new();
    let scheduler = services.scheduler.clone();
    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });
    tracing::info!("Worker started");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, finishing current work");

    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, scheduler_handle)
        .await
        .is_err()
    {
        tracing::warn!("Scheduler did not stop within the grace period");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shiftwatch_worker=info,shiftwatch_events=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
