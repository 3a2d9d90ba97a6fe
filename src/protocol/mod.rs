//! # Receiver Line Protocol
//!
//! Turns the FS26 receiver's text output into telemetry samples.
//!
//! This module handles:
//! - Framing the raw byte stream into lines
//! - Detecting field markers in priority order
//! - Assembling fields into samples, terminated by the signal line

pub mod assembler;
pub mod framer;
pub mod markers;

pub use assembler::{LineOutcome, RecordAssembler};
pub use framer::LineFramer;
