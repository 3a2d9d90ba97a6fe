//! # Telemetry Module
//!
//! Holds committed telemetry for live display.
//!
//! This module handles:
//! - Finalized samples and their per-field history rings
//! - The latest-fields projection and receive counter
//! - Connection liveness (live / stale / disconnected)
//! - Consistent snapshots for concurrent readers
//! - Periodic status reports on the display cadence

pub mod report;
pub mod store;
pub mod types;

pub use report::{StatusReport, StatusReporter};
pub use store::{TelemetrySnapshot, TelemetryStore};
pub use types::{
    ConnectionState, ConnectionStatus, History, HistoryPoint, LatestFields, LinkStatus, Sample,
};
