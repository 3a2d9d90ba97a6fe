//! # Receiver Line Markers
//!
//! Field markers printed by the FS26 receiver firmware, one per line:
//!
//! ```text
//! ║  Position:   12.340000, -98.760000                     ║
//! ║  Speed:      45.6 kph                                  ║
//! ║  Altitude:   123.4 m                                   ║
//! ║  Satellites: 8                                         ║
//! ║  GPS Fix:    Valid                                     ║
//! ║  TX Count:   17                                        ║
//! ║  RSSI: -80 dBm  |  SNR: 9 dB  |  RX Count: 12          ║
//! ```

/// Two comma-separated floats: latitude, longitude
pub const POSITION: &str = "Position:";

/// Ground speed float followed by a unit token
pub const SPEED: &str = "Speed:";

/// Altitude float followed by a unit token
pub const ALTITUDE: &str = "Altitude:";

pub const SATELLITES: &str = "Satellites:";

pub const GPS_FIX: &str = "GPS Fix:";

/// Token that marks a valid fix on the `GPS Fix:` line
pub const FIX_VALID_TOKEN: &str = "Valid";

pub const TX_COUNT: &str = "TX Count:";

/// Signal-strength marker; its line terminates a record
pub const RSSI: &str = "RSSI:";

pub const SNR: &str = "SNR:";

/// Optional third segment of the terminator line
pub const RX_COUNT: &str = "RX Count:";

/// Separates the segments of the terminator line
pub const SEGMENT_SEPARATOR: char = '|';

/// Recognized field kinds, in matching priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Position,
    Speed,
    Altitude,
    Satellites,
    GpsFix,
    TxCount,
    Signal,
}

impl Marker {
    /// Every marker in the order lines are tested against them
    pub const PRIORITY: [Marker; 7] = [
        Marker::Position,
        Marker::Speed,
        Marker::Altitude,
        Marker::Satellites,
        Marker::GpsFix,
        Marker::TxCount,
        Marker::Signal,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Marker::Position => POSITION,
            Marker::Speed => SPEED,
            Marker::Altitude => ALTITUDE,
            Marker::Satellites => SATELLITES,
            Marker::GpsFix => GPS_FIX,
            Marker::TxCount => TX_COUNT,
            Marker::Signal => RSSI,
        }
    }

    /// First marker (by priority) contained in `line`, with the text after it
    pub fn detect(line: &str) -> Option<(Marker, &str)> {
        Self::PRIORITY.iter().find_map(|&marker| {
            let text = marker.text();
            line.find(text).map(|idx| (marker, &line[idx + text.len()..]))
        })
    }
}
