//! # FS26 Telemetry
//!
//! Ingest live GPS telemetry from an FS26 LoRa receiver over USB serial.
//!
//! The receiver prints one block of labelled lines per received packet. This
//! application keeps the receiver link alive, parses every block into a
//! sample, and keeps the most recent samples in memory for display.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::time::interval;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fs26_telemetry::config::{Config, LoggingConfig};
use fs26_telemetry::ingest::{IngestLoop, IngestSettings, IngestWorker};
use fs26_telemetry::serial::{SerialLocator, SerialOpener};
use fs26_telemetry::telemetry::{StatusReporter, TelemetryStore};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for daily-rolling log files
const LOG_FILE_PREFIX: &str = "fs26-telemetry.log";

/// Load configuration from the first argument, the default file, or built-in defaults
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config from {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("loading config from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard must be held
/// for the lifetime of the process so buffered file logs are flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Main entry point for FS26 Telemetry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Create the shared telemetry store
///    - Spawn the ingest worker (search → open → read → close, forever)
///
/// 2. **Main Loop**
///    - Poll a status report from the store every `report_interval_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Cancel the ingest worker and wait for it to release the device
///    - Log total samples received
///
/// Expected output:
/// ```text
/// INFO fs26_telemetry: FS26 Telemetry v0.1.0 starting...
/// INFO fs26_telemetry::ingest: Connected to receiver at /dev/ttyACM1
/// INFO fs26_telemetry::telemetry::report: Link live on /dev/ttyACM1 (RX: 1)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("FS26 Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(TelemetryStore::new(
        config.telemetry.history_capacity,
        config.telemetry.stale_after(),
    ));

    let ingest = IngestLoop::new(
        SerialLocator::from_config(&config.serial),
        SerialOpener::from_config(&config.serial),
        Arc::clone(&store),
        IngestSettings::from(&config),
    );
    let worker = IngestWorker::spawn(ingest);

    let mut reporter = StatusReporter::new();
    let mut report_interval = interval(config.telemetry.report_interval());

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = report_interval.tick() => {
                reporter.poll(&store);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    worker.shutdown().await?;
    info!("Total samples received: {}", store.latest_fields().rx_count);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(path).expect("shipped config should load");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.telemetry.history_capacity, 500);
    }

    #[test]
    fn test_log_file_prefix() {
        assert!(LOG_FILE_PREFIX.ends_with(".log"));
    }
}
