//! # Status Reporter
//!
//! Polls the store on the display cadence and logs link transitions.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::store::TelemetryStore;
use super::types::{ConnectionStatus, LatestFields, LinkStatus};

/// One poll of the store, as a display would render it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub connection: ConnectionStatus,
    pub latest: LatestFields,
    pub history_len: usize,
    /// Link status differs from the previous poll
    #[serde(skip)]
    pub link_changed: bool,
}

impl StatusReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Read-only consumer of [`TelemetryStore`]
#[derive(Debug, Default)]
pub struct StatusReporter {
    last_link: Option<LinkStatus>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(&mut self, store: &TelemetryStore) -> StatusReport {
        let snapshot = store.snapshot();
        let connection = store.connection_status();
        let link_changed = self.last_link != Some(connection.link);
        self.last_link = Some(connection.link);

        let report = StatusReport {
            connection,
            latest: snapshot.latest,
            history_len: snapshot.history.len(),
            link_changed,
        };

        if link_changed {
            let path = report.connection.path.as_deref().unwrap_or("-");
            match report.connection.link {
                LinkStatus::Live => info!("Link live on {} (RX: {})", path, report.latest.rx_count),
                LinkStatus::Stale => warn!("Link on {} connected but no data", path),
                LinkStatus::Disconnected => warn!("Link disconnected"),
            }
        }

        match report.to_json() {
            Ok(json) => debug!(target: "fs26_telemetry::status", "{}", json),
            Err(e) => debug!("Failed to serialize status report: {}", e),
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::types::fixtures::sample;
    use crate::telemetry::types::Sample;

    #[test]
    fn test_first_poll_reports_change() {
        let store = TelemetryStore::default();
        let mut reporter = StatusReporter::new();

        let report = reporter.poll(&store);
        assert!(report.link_changed);
        assert_eq!(report.connection.link, LinkStatus::Disconnected);
        assert_eq!(report.history_len, 0);

        assert!(!reporter.poll(&store).link_changed);
    }

    #[test]
    fn test_transitions_are_detected() {
        let store = TelemetryStore::default();
        let mut reporter = StatusReporter::new();
        reporter.poll(&store);

        store.set_connection(Some("/dev/ttyACM1".to_string()), true);
        let report = reporter.poll(&store);
        assert!(report.link_changed);
        assert_eq!(report.connection.link, LinkStatus::Stale);

        store.record(sample(4));
        let report = reporter.poll(&store);
        assert!(report.link_changed);
        assert_eq!(report.connection.link, LinkStatus::Live);
        assert_eq!(report.latest.rx_count, 1);
        assert_eq!(report.history_len, 1);
    }

    #[test]
    fn test_report_json_shape() {
        let store = TelemetryStore::default();
        store.set_connection(Some("/dev/ttyACM1".to_string()), true);
        store.record(Sample {
            device_rx_count: Some(330),
            ..sample(2)
        });

        let report = StatusReporter::new().poll(&store);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["connection"]["link"], "live");
        assert_eq!(value["connection"]["path"], "/dev/ttyACM1");
        assert_eq!(value["latest"]["rx_count"], 1);
        assert_eq!(value["latest"]["device_rx_count"], 330);
        assert_eq!(value["history_len"], 1);
        assert!(value.get("link_changed").is_none());
    }
}
