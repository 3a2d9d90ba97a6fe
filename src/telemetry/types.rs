//! # Telemetry Types
//!
//! Finalized samples, the bounded per-field history, and the link state
//! exposed to readers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of samples retained by default (~4 minutes at the receiver's 2Hz rate)
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

/// One finalized, timestamped telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Wall-clock time the terminating line was parsed
    pub timestamp: DateTime<Utc>,

    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// Ground speed in km/h
    pub speed_kph: f64,

    /// Altitude in meters
    pub altitude_m: f64,

    /// Satellites used in the fix
    pub satellites: u16,

    /// Whether the transmitter reported a valid GPS fix
    pub fix_valid: bool,

    /// Received signal strength in dBm
    pub rssi_dbm: i16,

    /// Signal-to-noise ratio in dB
    pub snr_db: i16,

    /// Packets sent, as counted by the transmitter
    pub tx_count: u32,

    /// Packets received, as counted by the receiver firmware (if reported)
    pub device_rx_count: Option<u32>,
}

/// Most recent committed field values plus the local receive counter
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LatestFields {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: f64,
    pub altitude_m: f64,
    pub satellites: u16,
    pub fix_valid: bool,
    pub rssi_dbm: i16,
    pub snr_db: i16,
    pub tx_count: u32,
    /// Receive count reported by the receiver firmware on the last sample
    pub device_rx_count: Option<u32>,
    /// Samples committed since start; never decreases
    pub rx_count: u64,
}

impl LatestFields {
    pub(crate) fn from_sample(sample: &Sample, rx_count: u64) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            speed_kph: sample.speed_kph,
            altitude_m: sample.altitude_m,
            satellites: sample.satellites,
            fix_valid: sample.fix_valid,
            rssi_dbm: sample.rssi_dbm,
            snr_db: sample.snr_db,
            tx_count: sample.tx_count,
            device_rx_count: sample.device_rx_count,
            rx_count,
        }
    }
}

/// One row of [`History`], reassembled across the per-field rings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: f64,
    pub altitude_m: f64,
    pub satellites: u16,
    pub rssi_dbm: i16,
    pub snr_db: i16,
}

/// Fixed-capacity history of recent samples
///
/// Each charted field lives in its own ring next to a shared timestamp ring.
/// All rings are advanced together by [`History::push`], so index `i` in every
/// ring always refers to the same sample.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    latitude: VecDeque<f64>,
    longitude: VecDeque<f64>,
    speed_kph: VecDeque<f64>,
    altitude_m: VecDeque<f64>,
    satellites: VecDeque<u16>,
    rssi_dbm: VecDeque<i16>,
    snr_db: VecDeque<i16>,
}

fn push_bounded<T>(ring: &mut VecDeque<T>, value: T, capacity: usize) {
    if ring.len() == capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}

impl History {
    /// Create an empty history holding at most `capacity` samples
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
            latitude: VecDeque::with_capacity(capacity),
            longitude: VecDeque::with_capacity(capacity),
            speed_kph: VecDeque::with_capacity(capacity),
            altitude_m: VecDeque::with_capacity(capacity),
            satellites: VecDeque::with_capacity(capacity),
            rssi_dbm: VecDeque::with_capacity(capacity),
            snr_db: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample to every ring, evicting the oldest entry when full
    pub fn push(&mut self, sample: &Sample) {
        let cap = self.capacity;
        push_bounded(&mut self.timestamps, sample.timestamp, cap);
        push_bounded(&mut self.latitude, sample.latitude, cap);
        push_bounded(&mut self.longitude, sample.longitude, cap);
        push_bounded(&mut self.speed_kph, sample.speed_kph, cap);
        push_bounded(&mut self.altitude_m, sample.altitude_m, cap);
        push_bounded(&mut self.satellites, sample.satellites, cap);
        push_bounded(&mut self.rssi_dbm, sample.rssi_dbm, cap);
        push_bounded(&mut self.snr_db, sample.snr_db, cap);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Lengths of every ring, in declaration order
    pub fn ring_lengths(&self) -> [usize; 8] {
        [
            self.timestamps.len(),
            self.latitude.len(),
            self.longitude.len(),
            self.speed_kph.len(),
            self.altitude_m.len(),
            self.satellites.len(),
            self.rssi_dbm.len(),
            self.snr_db.len(),
        ]
    }

    /// Row `index`, oldest first
    pub fn get(&self, index: usize) -> Option<HistoryPoint> {
        Some(HistoryPoint {
            timestamp: *self.timestamps.get(index)?,
            latitude: *self.latitude.get(index)?,
            longitude: *self.longitude.get(index)?,
            speed_kph: *self.speed_kph.get(index)?,
            altitude_m: *self.altitude_m.get(index)?,
            satellites: *self.satellites.get(index)?,
            rssi_dbm: *self.rssi_dbm.get(index)?,
            snr_db: *self.snr_db.get(index)?,
        })
    }

    /// All rows, oldest first
    pub fn points(&self) -> impl Iterator<Item = HistoryPoint> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &DateTime<Utc>> + '_ {
        self.timestamps.iter()
    }

    /// (latitude, longitude) track, oldest first
    pub fn track(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.latitude.iter().copied().zip(self.longitude.iter().copied())
    }

    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.speed_kph.iter().copied()
    }

    pub fn altitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.altitude_m.iter().copied()
    }

    pub fn satellites(&self) -> impl Iterator<Item = u16> + '_ {
        self.satellites.iter().copied()
    }

    pub fn rssi(&self) -> impl Iterator<Item = i16> + '_ {
        self.rssi_dbm.iter().copied()
    }

    pub fn snr(&self) -> impl Iterator<Item = i16> + '_ {
        self.snr_db.iter().copied()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Device link state, written only by the ingest loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    /// Device path of the current (or most recent) connection
    pub path: Option<String>,
    pub connected: bool,
    /// Monotonic time of the most recent committed sample
    pub last_sample: Option<Instant>,
}

/// Liveness indicator derived from [`ConnectionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Connected and receiving samples
    Live,
    /// Connected, but no sample within the staleness window
    Stale,
    Disconnected,
}

/// Reader-facing view of the connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub path: Option<String>,
    pub seconds_since_last_sample: Option<f64>,
    pub link: LinkStatus,
}

impl ConnectionState {
    /// Evaluate liveness at `now` against the `stale_after` window
    pub fn status_at(&self, now: Instant, stale_after: Duration) -> ConnectionStatus {
        let age = self.last_sample.map(|t| now.saturating_duration_since(t));
        let link = match (self.connected, age) {
            (false, _) => LinkStatus::Disconnected,
            (true, Some(age)) if age < stale_after => LinkStatus::Live,
            (true, _) => LinkStatus::Stale,
        };

        ConnectionStatus {
            connected: self.connected,
            path: self.path.clone(),
            seconds_since_last_sample: age.map(|a| a.as_secs_f64()),
            link,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Sample whose numeric fields are all derived from `n`
    pub fn sample(n: u32) -> Sample {
        Sample {
            timestamp: Utc::now(),
            latitude: n as f64,
            longitude: -(n as f64),
            speed_kph: n as f64 * 0.5,
            altitude_m: 100.0 + n as f64,
            satellites: (n % 20) as u16,
            fix_valid: n % 2 == 0,
            rssi_dbm: -(n as i16 % 120),
            snr_db: (n % 15) as i16,
            tx_count: n,
            device_rx_count: None,
        }
    }
}
