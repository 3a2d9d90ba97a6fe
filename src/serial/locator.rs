//! Serial device discovery

use std::path::Path;
use tracing::debug;

use crate::config::SerialConfig;

/// Finds the path of a candidate telemetry device
#[cfg_attr(test, mockall::automock)]
pub trait DeviceLocator: Send + Sync {
    /// Path of the first available device, or `None` if nothing is attached
    fn locate(&self) -> Option<String>;
}

/// Checks preferred paths in order, then falls back to a wildcard scan
#[derive(Debug, Clone)]
pub struct SerialLocator {
    preferred: Vec<String>,
    pattern: Option<String>,
}

impl SerialLocator {
    /// # Arguments
    ///
    /// * `preferred` - Device paths to check first (e.g., `["/dev/ttyACM1"]`)
    /// * `pattern` - Glob scanned when none of them exist (e.g., `/dev/ttyACM*`)
    pub fn new(preferred: Vec<String>, pattern: Option<String>) -> Self {
        Self {
            preferred,
            pattern: pattern.filter(|p| !p.is_empty()),
        }
    }

    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(config.device_paths.clone(), Some(config.device_glob.clone()))
    }

    fn scan(&self) -> Option<String> {
        let pattern = self.pattern.as_deref()?;
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                debug!("Invalid device pattern {}: {}", pattern, e);
                return None;
            }
        };

        // glob yields matches in sorted order
        paths
            .filter_map(|entry| entry.ok())
            .next()
            .map(|path| path.to_string_lossy().into_owned())
    }
}

impl DeviceLocator for SerialLocator {
    fn locate(&self) -> Option<String> {
        if let Some(path) = self.preferred.iter().find(|p| Path::new(p.as_str()).exists()) {
            return Some(path.clone());
        }
        self.scan()
    }
}
