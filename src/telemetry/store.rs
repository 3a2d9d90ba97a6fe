//! # Telemetry Store
//!
//! The single point of shared state between the ingest worker and readers.
//!
//! History rings, latest fields, the receive counter and the connection
//! state all sit behind one [`RwLock`]. [`TelemetryStore::record`] holds the
//! write lock across the whole multi-ring append, so a reader holding the read
//! lock only ever sees fully committed samples.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{
    ConnectionState, ConnectionStatus, History, LatestFields, Sample, DEFAULT_HISTORY_CAPACITY,
};

/// Default age after which a connected link is reported stale
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5);

/// Consistent point-in-time view of the store
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub latest: LatestFields,
    pub history: History,
}

#[derive(Debug)]
struct StoreInner {
    history: History,
    latest: LatestFields,
    connection: ConnectionState,
}

/// Bounded, concurrently readable telemetry history
///
/// Constructed once and shared as `Arc<TelemetryStore>`.
#[derive(Debug)]
pub struct TelemetryStore {
    inner: RwLock<StoreInner>,
    stale_after: Duration,
}

impl TelemetryStore {
    pub fn new(capacity: usize, stale_after: Duration) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                history: History::new(capacity),
                latest: LatestFields::default(),
                connection: ConnectionState::default(),
            }),
            stale_after,
        }
    }

    // Every mutation leaves StoreInner valid before the next statement, so a
    // poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Commit a finalized sample
    ///
    /// Appends to every history ring, refreshes the latest fields, bumps the
    /// receive counter and stamps the connection's last-sample time, all in
    /// one critical section.
    pub fn record(&self, sample: Sample) {
        let now = Instant::now();
        let mut inner = self.write();

        inner.history.push(&sample);
        let rx_count = inner.latest.rx_count + 1;
        inner.latest = LatestFields::from_sample(&sample, rx_count);
        inner.connection.last_sample = Some(now);
        drop(inner);

        debug!(
            rx_count,
            lat = sample.latitude,
            lon = sample.longitude,
            rssi = sample.rssi_dbm,
            device_rx = ?sample.device_rx_count,
            "Committed telemetry sample"
        );
    }

    /// Latest fields and a copy of the history from the same commit
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let inner = self.read();
        TelemetrySnapshot {
            latest: inner.latest,
            history: inner.history.clone(),
        }
    }

    pub fn latest_fields(&self) -> LatestFields {
        self.read().latest
    }

    pub fn history(&self) -> History {
        self.read().history.clone()
    }

    /// Replace the path and connected flag, keeping the last-sample time
    pub fn set_connection(&self, path: Option<String>, connected: bool) {
        let mut inner = self.write();
        inner.connection.path = path;
        inner.connection.connected = connected;
    }

    /// Mark the link down without forgetting which device it was
    pub fn set_disconnected(&self) {
        self.write().connection.connected = false;
    }

    pub fn connection(&self) -> ConnectionState {
        self.read().connection.clone()
    }

    /// Connection view with the staleness age evaluated now
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection().status_at(Instant::now(), self.stale_after)
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_STALE_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RecordAssembler;
    use crate::telemetry::types::fixtures::sample;
    use crate::telemetry::types::LinkStatus;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_store() {
        let store = TelemetryStore::default();
        let snap = store.snapshot();
        assert_eq!(snap.latest, LatestFields::default());
        assert!(snap.history.is_empty());
        assert_eq!(snap.history.capacity(), 500);
    }

    #[test]
    fn test_record_updates_latest_and_history() {
        let store = TelemetryStore::default();
        store.record(sample(3));
        store.record(sample(4));

        let snap = store.snapshot();
        assert_eq!(snap.latest.rx_count, 2);
        assert_eq!(snap.latest.latitude, 4.0);
        assert_eq!(snap.history.len(), 2);
        assert_eq!(snap.history.get(1).unwrap().latitude, 4.0);
        assert!(store.connection().last_sample.is_some());
    }

    #[test]
    fn test_receiver_rx_count_reaches_latest_fields() {
        let store = TelemetryStore::default();
        let mut assembler = RecordAssembler::new();
        assembler.apply("Position: 48.100000, 11.500000");
        let sample = assembler
            .apply("RSSI: -80 dBm | SNR: 9 dB | RX Count: 330")
            .expect("signal line should finalize a sample");
        store.record(sample);

        let latest = store.snapshot().latest;
        assert_eq!(latest.device_rx_count, Some(330));
        assert_eq!(latest.rx_count, 1);

        // A record without the segment clears it again
        let sample = assembler.apply("RSSI: -81 dBm | SNR: 8 dB").unwrap();
        store.record(sample);
        assert_eq!(store.latest_fields().device_rx_count, None);
    }

    #[test]
    fn test_rx_count_keeps_counting_past_capacity() {
        let store = TelemetryStore::new(10, DEFAULT_STALE_AFTER);
        for n in 0..25 {
            store.record(sample(n));
        }

        let snap = store.snapshot();
        assert_eq!(snap.latest.rx_count, 25);
        assert_eq!(snap.history.len(), 10);
        assert_eq!(snap.history.get(0).unwrap().latitude, 15.0);
    }

    #[test]
    fn test_connection_round_trip() {
        let store = TelemetryStore::default();
        assert_eq!(store.connection_status().link, LinkStatus::Disconnected);

        store.set_connection(Some("/dev/ttyACM1".to_string()), true);
        let status = store.connection_status();
        assert!(status.connected);
        assert_eq!(status.link, LinkStatus::Stale);

        store.record(sample(1));
        assert_eq!(store.connection_status().link, LinkStatus::Live);

        store.set_disconnected();
        let state = store.connection();
        assert!(!state.connected);
        assert_eq!(state.path.as_deref(), Some("/dev/ttyACM1"));
        assert!(state.last_sample.is_some());
    }

    #[test]
    fn test_snapshot_consistency_under_concurrent_writes() {
        let capacity = 50;
        let store = Arc::new(TelemetryStore::new(capacity, DEFAULT_STALE_AFTER));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for n in 0..5_000 {
                    store.record(sample(n));
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut checked = 0u64;
                    while !done.load(Ordering::SeqCst) || checked == 0 {
                        let snap = store.snapshot();
                        let expected = (snap.latest.rx_count as usize).min(capacity);
                        assert_eq!(snap.history.len(), expected);
                        assert!(snap.history.ring_lengths().iter().all(|&l| l == expected));
                        if let Some(last) = snap.history.get(snap.history.len().wrapping_sub(1)) {
                            assert_eq!(last.latitude, snap.latest.latitude);
                        }
                        checked += 1;
                    }
                    checked
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(store.latest_fields().rx_count, 5_000);
        assert_eq!(store.history().len(), capacity);
    }
}
