//! Trait abstraction for serial port reads to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Trait for reading raw telemetry bytes from a connected device
#[async_trait]
pub trait TelemetryPort: Send {
    /// Read whatever bytes are available into `buf`
    ///
    /// Returns `Ok(0)` when the device has closed the stream.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Path the port was opened from
    fn device_path(&self) -> &str;
}

/// An open device stream together with the path it was opened from
///
/// Wraps `tokio_serial::SerialStream` in production and any in-memory
/// `AsyncRead` in tests. Dropping it closes the device.
pub struct SerialLink<S> {
    stream: S,
    device_path: String,
}

impl<S> SerialLink<S> {
    pub fn new(stream: S, device_path: impl Into<String>) -> Self {
        Self {
            stream,
            device_path: device_path.into(),
        }
    }
}

impl<S> std::fmt::Debug for SerialLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> TelemetryPort for SerialLink<S>
where
    S: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }

    fn device_path(&self) -> &str {
        &self.device_path
    }
}
