//! Background task wrapper for [`IngestLoop`]

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::IngestLoop;
use crate::error::{Result, TelemetryError};
use crate::serial::{DeviceLocator, PortOpener};

/// Handle to the single ingest task
///
/// The task runs until [`shutdown`](Self::shutdown) is called or the
/// cancellation token is triggered elsewhere.
#[derive(Debug)]
pub struct IngestWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl IngestWorker {
    /// Spawn `ingest` onto the current tokio runtime
    pub fn spawn<L, O>(ingest: IngestLoop<L, O>) -> Self
    where
        L: DeviceLocator + 'static,
        O: PortOpener + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ingest.run(cancel.clone()));
        Self { cancel, handle }
    }

    /// Token that stops the loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to release the device
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Worker` if the task panicked.
    pub async fn shutdown(self) -> Result<()> {
        debug!("Stopping ingest worker");
        self.cancel.cancel();
        self.handle
            .await
            .map_err(|e| TelemetryError::Worker(e.to_string()))
    }
}
