//! # FS26 Telemetry Library
//!
//! Live GPS telemetry from an FS26 LoRa receiver over USB serial.
//!
//! This library provides the ingestion pipeline: device discovery with retry,
//! framing the serial byte stream into lines, assembling lines into samples,
//! and a bounded history shared between the ingest worker and readers.

pub mod config;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod serial;
pub mod telemetry;
