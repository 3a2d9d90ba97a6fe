//! # Error Types
//!
//! Custom error types for FS26 Telemetry using `thiserror`.
//!
//! Line parsing never produces these errors; malformed telemetry lines are
//! reported through [`crate::protocol::assembler::LineOutcome`] instead.

use thiserror::Error;

/// Main error type for FS26 Telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Serial port open or configuration errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ingest worker failed to join cleanly
    #[error("Ingest worker error: {0}")]
    Worker(String),
}

/// Result type alias for FS26 Telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;
