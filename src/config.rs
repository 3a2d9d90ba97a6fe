//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TelemetryError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub framing: FramingConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port discovery and link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device paths checked first, in order of preference
    #[serde(default = "default_device_paths")]
    pub device_paths: Vec<String>,

    /// Wildcard pattern scanned when no preferred path exists
    #[serde(default = "default_device_glob")]
    pub device_glob: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Back-off after discovery finds no device
    #[serde(default = "default_search_interval_ms")]
    pub search_interval_ms: u64,

    /// Back-off after an open failure or a dropped connection
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Idle sleep when the port reports no data available
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Line framing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FramingConfig {
    /// Longest partial line held before the buffer is dropped
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

/// Telemetry history configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Age after which a connected link is reported as stale
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,

    /// Snapshot cadence of the status reporter
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_device_paths() -> Vec<String> { vec!["/dev/ttyACM1".to_string()] }
fn default_device_glob() -> String { "/dev/ttyACM*".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }
fn default_search_interval_ms() -> u64 { 2000 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 10 }

fn default_max_line_bytes() -> usize { 4096 }

fn default_history_capacity() -> usize { 500 }
fn default_stale_after_ms() -> u64 { 5000 }
fn default_report_interval_ms() -> u64 { 500 }

fn default_log_level() -> String { "info".to_string() }

/// Baud rates accepted by the receiver's USB CDC bridge
const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device_paths: default_device_paths(),
            device_glob: default_device_glob(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            search_interval_ms: default_search_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self { max_line_bytes: default_max_line_bytes() }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            stale_after_ms: default_stale_after_ms(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), log_dir: None }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl TelemetryConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fs26_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.device_paths.iter().any(|p| p.is_empty()) {
            return Err(invalid("device_paths cannot contain empty entries"));
        }

        if self.serial.device_paths.is_empty() && self.serial.device_glob.is_empty() {
            return Err(invalid("either device_paths or device_glob must be set"));
        }

        if !self.serial.device_glob.is_empty() {
            if let Err(e) = glob::Pattern::new(&self.serial.device_glob) {
                return Err(invalid(format!("device_glob is not a valid pattern: {}", e)));
            }
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        for (name, value) in [
            ("search_interval_ms", self.serial.search_interval_ms),
            ("reconnect_interval_ms", self.serial.reconnect_interval_ms),
            ("poll_interval_ms", self.serial.poll_interval_ms),
            ("stale_after_ms", self.telemetry.stale_after_ms),
            ("report_interval_ms", self.telemetry.report_interval_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.framing.max_line_bytes < 64 || self.framing.max_line_bytes > 1024 * 1024 {
            return Err(invalid("max_line_bytes must be between 64 and 1048576"));
        }

        if self.telemetry.history_capacity == 0 {
            return Err(invalid("history_capacity must be greater than 0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!("log level must be one of: {}", LOG_LEVELS.join(", "))));
        }

        if matches!(self.logging.log_dir.as_deref(), Some("")) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}
