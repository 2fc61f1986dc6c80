//! CloudLog pump - stdin driver
//!
//! Reads newline-delimited JSON analytics records from stdin and writes them
//! to the configured pumps in batches.
//!
//! ## Usage
//!
//! ```bash
//! CLOUDLOG_URL=https://logs.example.com/ingest \
//! CLOUDLOG_TOKEN=secret \
//! CLOUDLOG_ENVIRONMENT=production \
//!     cloudlog-pump < analytics.jsonl
//! ```
//!
//! ## Environment Variables
//!
//! - `CLOUDLOG_URL`: ingestion endpoint (no pump is configured without it)
//! - `CLOUDLOG_TOKEN`: `Authorization` header value, sent as-is
//! - `CLOUDLOG_ENVIRONMENT`: environment label added to every record
//! - `PUMP_TIMEOUT_SECS`: delivery timeout, 0 disables (default: 0)
//! - `PUMP_BATCH_SIZE`: records per batch (default: 100)
//! - `PUMP_LOG_LEVEL`: log level when `RUST_LOG` is unset (default: "info")
//! - `PUMP_LOG_FORMAT`: "pretty" or "json" (default: "pretty")

use cloudlog_pump::config::{Config, LogFormat};
use cloudlog_pump::error::PumpError;
use cloudlog_pump::feed::run_feed;
use cloudlog_pump::registry::PumpRegistry;
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        batch_size = config.batch_size,
        timeout_secs = config.timeout_secs,
        "Starting CloudLog pump"
    );

    let mut registry = PumpRegistry::with_builtin();
    match config.cloudlog_pump_config() {
        Some(conf) => registry
            .add("cloudlog", &conf, config.timeout_secs)
            .map_err(|e| PumpError::plugin("cloudlog", e))?,
        None => warn!("CLOUDLOG_URL not set, no pumps configured"),
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let stdin = BufReader::new(tokio::io::stdin());
    let summary = run_feed(stdin, &registry, &cancel, config.batch_size).await?;

    info!(
        batches = summary.batches,
        records = summary.records,
        dropped_batches = summary.dropped_batches,
        "CloudLog pump shutdown complete"
    );
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into());
    let subscriber = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        LogFormat::Pretty => subscriber.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
