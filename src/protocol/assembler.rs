//! # Record Assembler
//!
//! Folds receiver lines into finalized [`Sample`]s.
//!
//! Each line is classified by [`parse_line`] into a typed [`LineOutcome`]:
//! either a field update or a skip with its reason. Skips never touch the
//! in-progress field set. The `RSSI:`/`SNR:` line terminates a record: once
//! both values parse, the current field set is stamped and returned.
//!
//! Fields carry forward: a record that omits a line reuses the value from
//! the previous record.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::trace;

use super::markers::{self, Marker};
use crate::telemetry::Sample;

/// In-progress values for one record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldSet {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: f64,
    pub altitude_m: f64,
    pub satellites: u16,
    pub fix_valid: bool,
    pub tx_count: u32,
    pub rssi_dbm: i16,
    pub snr_db: i16,
}

/// A successfully parsed line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldUpdate {
    Position { latitude: f64, longitude: f64 },
    Speed(f64),
    Altitude(f64),
    Satellites(u16),
    Fix(bool),
    TxCount(u32),
    /// Record terminator
    Signal {
        rssi_dbm: i16,
        snr_db: i16,
        device_rx_count: Option<u32>,
    },
}

/// Why a line produced no update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Blank after trimming
    Empty,
    /// No known marker in the line
    Unrecognized,
    /// Marker found but its numeric content did not parse
    Malformed(Marker),
}

/// Result of classifying one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    Update(FieldUpdate),
    Skip(SkipReason),
}

/// Diagnostic counters; they do not influence assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblerStats {
    pub lines: u64,
    pub updates: u64,
    pub unrecognized: u64,
    pub malformed: u64,
    pub samples: u64,
}

fn first_token(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

fn number<T: FromStr>(s: &str) -> Option<T> {
    first_token(s)?.parse().ok()
}

fn float(s: &str) -> Option<f64> {
    number::<f64>(s).filter(|v| v.is_finite())
}

/// Text following `marker` in whichever `|` segment contains it
fn segment_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.split(markers::SEGMENT_SEPARATOR).find_map(|segment| {
        segment.find(marker).map(|idx| &segment[idx + marker.len()..])
    })
}

fn parse_position(rest: &str) -> Option<FieldUpdate> {
    let mut parts = rest.split(',');
    let latitude = parts.next().and_then(float)?;
    // Longitude may be followed by a unit or trailing decoration
    let longitude = parts.next().and_then(float)?;
    Some(FieldUpdate::Position { latitude, longitude })
}

fn parse_signal(line: &str) -> Option<FieldUpdate> {
    let rssi_dbm = segment_after(line, markers::RSSI).and_then(number)?;
    let snr_db = segment_after(line, markers::SNR).and_then(number)?;
    let device_rx_count = segment_after(line, markers::RX_COUNT).and_then(number);
    Some(FieldUpdate::Signal { rssi_dbm, snr_db, device_rx_count })
}

/// Classify one line without touching any state
pub fn parse_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip(SkipReason::Empty);
    }

    let Some((marker, rest)) = Marker::detect(line) else {
        return LineOutcome::Skip(SkipReason::Unrecognized);
    };

    let update = match marker {
        Marker::Position => parse_position(rest),
        Marker::Speed => float(rest).map(FieldUpdate::Speed),
        Marker::Altitude => float(rest).map(FieldUpdate::Altitude),
        Marker::Satellites => number(rest).map(FieldUpdate::Satellites),
        Marker::GpsFix => Some(FieldUpdate::Fix(rest.contains(markers::FIX_VALID_TOKEN))),
        Marker::TxCount => number(rest).map(FieldUpdate::TxCount),
        Marker::Signal => parse_signal(line),
    };

    match update {
        Some(update) => LineOutcome::Update(update),
        None => LineOutcome::Skip(SkipReason::Malformed(marker)),
    }
}

/// Per-record state machine over receiver lines
#[derive(Debug, Default)]
pub struct RecordAssembler {
    pending: FieldSet,
    committed: FieldSet,
    stats: AssemblerStats,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one line; returns the finalized sample when the line terminates a record
    pub fn apply(&mut self, line: &str) -> Option<Sample> {
        self.apply_at(line, Utc::now())
    }

    /// Like [`apply`](Self::apply) with an explicit timestamp for the finalized sample
    pub fn apply_at(&mut self, line: &str, now: DateTime<Utc>) -> Option<Sample> {
        let outcome = parse_line(line);
        if outcome == LineOutcome::Skip(SkipReason::Empty) {
            return None;
        }
        self.stats.lines += 1;

        let update = match outcome {
            LineOutcome::Update(update) => update,
            LineOutcome::Skip(reason) => {
                match reason {
                    SkipReason::Malformed(marker) => {
                        self.stats.malformed += 1;
                        trace!(?marker, line, "Skipping malformed telemetry line");
                    }
                    _ => self.stats.unrecognized += 1,
                }
                return None;
            }
        };
        self.stats.updates += 1;

        let fields = &mut self.pending;
        match update {
            FieldUpdate::Position { latitude, longitude } => {
                fields.latitude = latitude;
                fields.longitude = longitude;
            }
            FieldUpdate::Speed(v) => fields.speed_kph = v,
            FieldUpdate::Altitude(v) => fields.altitude_m = v,
            FieldUpdate::Satellites(v) => fields.satellites = v,
            FieldUpdate::Fix(v) => fields.fix_valid = v,
            FieldUpdate::TxCount(v) => fields.tx_count = v,
            FieldUpdate::Signal { rssi_dbm, snr_db, device_rx_count } => {
                fields.rssi_dbm = rssi_dbm;
                fields.snr_db = snr_db;
                return Some(self.finalize(now, device_rx_count));
            }
        }
        None
    }

    fn finalize(&mut self, timestamp: DateTime<Utc>, device_rx_count: Option<u32>) -> Sample {
        let f = self.pending;
        self.committed = f;
        self.stats.samples += 1;

        Sample {
            timestamp,
            latitude: f.latitude,
            longitude: f.longitude,
            speed_kph: f.speed_kph,
            altitude_m: f.altitude_m,
            satellites: f.satellites,
            fix_valid: f.fix_valid,
            rssi_dbm: f.rssi_dbm,
            snr_db: f.snr_db,
            tx_count: f.tx_count,
            device_rx_count,
        }
    }

    /// Revert fields received since the last finalized sample
    pub fn discard_partial(&mut self) {
        self.pending = self.committed;
    }

    /// Current in-progress field values
    pub fn fields(&self) -> &FieldSet {
        &self.pending
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}
