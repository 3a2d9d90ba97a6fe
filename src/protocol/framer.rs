//! # Line Framer
//!
//! Splits the raw serial byte stream into newline-delimited text lines.

use bytes::{Buf, BytesMut};
use tracing::warn;

/// Default cap on the length of a single line
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

/// Accumulates raw bytes and yields complete lines
///
/// Bytes after the last newline stay buffered for the next [`feed`](Self::feed).
/// A line longer than `max_line_bytes` is dropped whole, whether it arrived in
/// one chunk or many. Once a buffered partial line passes the cap its bytes are
/// released and the rest of it is discarded up to the next newline, so the
/// buffer stays bounded.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    max_line_bytes: usize,
    resyncing: bool,
    overflows: u64,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_line_bytes.min(DEFAULT_MAX_LINE_BYTES)),
            max_line_bytes,
            resyncing: false,
            overflows: 0,
        }
    }

    /// Append a chunk and iterate the complete lines now available
    ///
    /// Lines are decoded lossily, trimmed, and empty lines are skipped.
    /// Lines not consumed from the iterator remain buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(chunk);
        Lines { framer: self }
    }

    /// Bytes currently held without a terminating newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of lines dropped for exceeding the cap
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > self.max_line_bytes {
                    if !self.resyncing {
                        warn!(
                            "Dropping line over {} bytes without newline",
                            self.max_line_bytes
                        );
                        self.overflows += 1;
                    }
                    self.buffer.clear();
                    self.resyncing = true;
                }
                return None;
            };

            let raw = self.buffer.split_to(pos);
            self.buffer.advance(1);

            if std::mem::take(&mut self.resyncing) {
                continue;
            }

            if raw.len() > self.max_line_bytes {
                warn!("Dropping {} byte line (cap {})", raw.len(), self.max_line_bytes);
                self.overflows += 1;
                continue;
            }

            let line = String::from_utf8_lossy(&raw);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

/// Lazy iterator over the lines extracted by one [`LineFramer::feed`] call
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = "║  Position:   12.340000, -98.760000   ║\r\n\
║  Speed:      45.6 kph   ║\r\n\
\r\n\
║  RSSI: -80 dBm  |  SNR: 9 dB  |  RX Count: 3   ║\r\n\
trailing"
        .as_bytes();

    fn feed_all(framer: &mut LineFramer, chunks: &[&[u8]]) -> Vec<String> {
        chunks.iter().flat_map(|c| framer.feed(c).collect::<Vec<_>>()).collect()
    }

    #[test]
    fn test_single_chunk() {
        let mut framer = LineFramer::default();
        let lines: Vec<String> = framer.feed(b"Speed: 1 kph\nAltitude: 2 m\n").collect();
        assert_eq!(lines, vec!["Speed: 1 kph", "Altitude: 2 m"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.feed(b"Satel").count(), 0);
        assert_eq!(framer.pending(), 5);

        let lines: Vec<String> = framer.feed(b"lites: 8\n").collect();
        assert_eq!(lines, vec!["Satellites: 8"]);
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_lines() {
        let mut whole = LineFramer::default();
        let expected: Vec<String> = whole.feed(STREAM).collect();
        assert_eq!(expected.len(), 3);
        assert_eq!(whole.pending(), "trailing".len());

        for split in 0..=STREAM.len() {
            let (a, b) = STREAM.split_at(split);
            let mut framer = LineFramer::default();
            assert_eq!(feed_all(&mut framer, &[a, b]), expected, "split at {}", split);
        }

        let mut bytewise = LineFramer::default();
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(feed_all(&mut bytewise, &chunks), expected);
    }

    #[test]
    fn test_empty_and_whitespace_lines_are_skipped() {
        let mut framer = LineFramer::default();
        let lines: Vec<String> = framer.feed(b"\n   \n\t\r\nGPS Fix: Valid\n").collect();
        assert_eq!(lines, vec!["GPS Fix: Valid"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut framer = LineFramer::default();
        let lines: Vec<String> = framer.feed(b"TX Count: 7 \xFF\xFE\n").collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("TX Count: 7"));
        assert!(lines[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_unconsumed_lines_stay_buffered() {
        let mut framer = LineFramer::default();
        let first = framer.feed(b"a\nb\n").next();
        assert_eq!(first.as_deref(), Some("a"));

        let rest: Vec<String> = framer.feed(b"c\n").collect();
        assert_eq!(rest, vec!["b", "c"]);
    }

    #[test]
    fn test_overflow_drops_and_resyncs() {
        let mut framer = LineFramer::new(16);
        assert_eq!(framer.feed(&[b'x'; 20]).count(), 0);
        assert_eq!(framer.overflows(), 1);
        assert_eq!(framer.pending(), 0);

        // Tail of the oversized line is discarded up to the next newline
        let lines: Vec<String> = framer.feed(b"xxxx\nSpeed: 3 kph\n").collect();
        assert_eq!(lines, vec!["Speed: 3 kph"]);
    }

    #[test]
    fn test_oversized_line_is_dropped_however_it_arrives() {
        let mut stream = vec![b'y'; 100];
        stream.extend_from_slice(b"\nSpeed: 1 kph\n");

        let mut whole = LineFramer::new(64);
        let expected: Vec<String> = whole.feed(&stream).collect();
        assert_eq!(expected, vec!["Speed: 1 kph"]);
        assert_eq!(whole.overflows(), 1);

        for split in 0..=stream.len() {
            let (a, b) = stream.split_at(split);
            let mut framer = LineFramer::new(64);
            assert_eq!(feed_all(&mut framer, &[a, b]), expected, "split at {}", split);
            assert_eq!(framer.overflows(), 1, "split at {}", split);
        }

        let mut bytewise = LineFramer::new(64);
        let chunks: Vec<&[u8]> = stream.chunks(1).collect();
        assert_eq!(feed_all(&mut bytewise, &chunks), expected);
        assert_eq!(bytewise.overflows(), 1);
    }

    #[test]
    fn test_line_at_cap_is_kept() {
        let mut framer = LineFramer::new(16);
        let lines: Vec<String> = framer.feed(b"Altitude: 1234 m\n").collect();
        assert_eq!(lines, vec!["Altitude: 1234 m"]);
        assert_eq!(framer.overflows(), 0);
    }
}
