//! # Ingest Module
//!
//! Drives the receiver link end to end:
//!
//! ```text
//! Searching ──found──▶ Opening ──ok──▶ Connected ──fault──▶ Closing
//!     ▲  │                │                                  │
//!     │  └─none: wait 2s  └─error: wait 1s                   │
//!     └──────────────────────────────────────── wait 1s ─────┘
//! ```
//!
//! Every state boundary, back-off sleep and device read is raced against a
//! [`CancellationToken`]; cancellation moves the loop to `Stopped`. The device
//! handle lives only inside the `Connected` state and is dropped on every exit
//! from it.

pub mod worker;

pub use worker::IngestWorker;

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::framer::DEFAULT_MAX_LINE_BYTES;
use crate::protocol::{LineFramer, RecordAssembler};
use crate::serial::{DeviceLocator, PortOpener, TelemetryPort};
use crate::telemetry::TelemetryStore;

/// Size of the buffer handed to each device read
const READ_BUFFER_SIZE: usize = 1024;

/// Timing and buffering knobs for [`IngestLoop`]
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    /// Wait after discovery finds nothing
    pub search_interval: Duration,
    /// Wait after an open failure or a closed connection
    pub reconnect_interval: Duration,
    /// Idle sleep when the port reports it has nothing to read
    pub poll_interval: Duration,
    /// Upper bound on a single read
    pub read_timeout: Duration,
    pub max_line_bytes: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            search_interval: Duration::from_secs(2),
            reconnect_interval: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
            read_timeout: Duration::from_millis(100),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl From<&Config> for IngestSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_interval: config.serial.search_interval(),
            reconnect_interval: config.serial.reconnect_interval(),
            poll_interval: config.serial.poll_interval(),
            read_timeout: config.serial.read_timeout(),
            max_line_bytes: config.framing.max_line_bytes,
        }
    }
}

/// Connection lifecycle of the ingest loop
#[derive(Debug)]
pub enum IngestState<P> {
    Searching,
    Opening(String),
    Connected(P),
    Closing,
    Stopped,
}

/// Sleep for `duration` unless cancelled first; returns `false` on cancellation
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

/// Wait out a back-off, then search again
async fn back_off<P>(duration: Duration, cancel: &CancellationToken) -> IngestState<P> {
    if sleep_or_cancel(duration, cancel).await {
        IngestState::Searching
    } else {
        IngestState::Stopped
    }
}

/// Device bytes → lines → records → [`TelemetryStore`]
pub struct IngestLoop<L, O> {
    locator: L,
    opener: O,
    store: Arc<TelemetryStore>,
    settings: IngestSettings,
    assembler: RecordAssembler,
}

impl<L, O> IngestLoop<L, O>
where
    L: DeviceLocator,
    O: PortOpener,
{
    pub fn new(locator: L, opener: O, store: Arc<TelemetryStore>, settings: IngestSettings) -> Self {
        Self {
            locator,
            opener,
            store,
            settings,
            assembler: RecordAssembler::new(),
        }
    }

    /// Run until `cancel` fires
    ///
    /// No error ends the loop: discovery misses, open failures and read
    /// faults all lead back to `Searching` after a back-off.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Ingest loop started");
        let mut state = IngestState::Searching;

        loop {
            if cancel.is_cancelled() {
                state = IngestState::Stopped;
            }

            state = match state {
                IngestState::Searching => self.search(&cancel).await,
                IngestState::Opening(path) => self.open(path, &cancel).await,
                IngestState::Connected(port) => self.stream(port, &cancel).await,
                IngestState::Closing => self.close(&cancel).await,
                IngestState::Stopped => break,
            };
        }

        self.store.set_disconnected();
        info!("Ingest loop stopped");
    }

    async fn search(&self, cancel: &CancellationToken) -> IngestState<O::Port> {
        match self.locator.locate() {
            Some(path) => IngestState::Opening(path),
            None => {
                debug!(
                    "No receiver found, retrying in {:?}",
                    self.settings.search_interval
                );
                self.store.set_disconnected();
                back_off(self.settings.search_interval, cancel).await
            }
        }
    }

    async fn open(&self, path: String, cancel: &CancellationToken) -> IngestState<O::Port> {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return IngestState::Stopped,
            opened = self.opener.open(&path) => opened,
        };

        match opened {
            Ok(port) => {
                info!("Connected to receiver at {}", path);
                self.store.set_connection(Some(path), true);
                IngestState::Connected(port)
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                self.store.set_disconnected();
                back_off(self.settings.reconnect_interval, cancel).await
            }
        }
    }

    async fn stream(&mut self, mut port: O::Port, cancel: &CancellationToken) -> IngestState<O::Port> {
        let path = port.device_path().to_string();
        let mut framer = LineFramer::new(self.settings.max_line_bytes);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        let next = loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => break IngestState::Stopped,
                read = timeout(self.settings.read_timeout, port.read_chunk(&mut buf)) => read,
            };

            match read {
                // Nothing arrived within the read timeout
                Err(_) => continue,
                Ok(Ok(0)) => {
                    warn!("Receiver at {} closed the stream", path);
                    break IngestState::Closing;
                }
                Ok(Ok(n)) => {
                    for line in framer.feed(&buf[..n]) {
                        if let Some(sample) = self.assembler.apply(&line) {
                            self.store.record(sample);
                        }
                    }
                }
                Ok(Err(e))
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) =>
                {
                    if !sleep_or_cancel(self.settings.poll_interval, cancel).await {
                        break IngestState::Stopped;
                    }
                }
                Ok(Err(e)) => {
                    warn!("Read error on {}: {}", path, e);
                    break IngestState::Closing;
                }
            }
        };

        drop(port);
        self.assembler.discard_partial();
        debug!(
            pending_bytes = framer.pending(),
            overflows = framer.overflows(),
            stats = ?self.assembler.stats(),
            "Released {}",
            path
        );
        next
    }

    async fn close(&self, cancel: &CancellationToken) -> IngestState<O::Port> {
        self.store.set_disconnected();
        info!(
            "Receiver disconnected, searching again in {:?}",
            self.settings.reconnect_interval
        );
        back_off(self.settings.reconnect_interval, cancel).await
    }
}
