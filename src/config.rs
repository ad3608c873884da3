//! Pipeline configuration
//!
//! Every field has a default, so a partial (or absent) config file is valid.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Movement (px) a gesture must exceed to count as a swipe
pub const DEFAULT_SWIPE_THRESHOLD_PX: f64 = 20.0;

/// Window (ms) within which identical taps collapse into one
pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 300;

/// Half-width (s) of the window joining taps and swipes onto screen visits
pub const DEFAULT_JOIN_WINDOW_SECS: i64 = 30;

/// Screen-recording poll period (s)
pub const DEFAULT_RECORDING_POLL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub swipe_threshold_px: f64,
    pub dedup_window_ms: i64,
    pub join_window_secs: i64,
    pub recording_poll_secs: u64,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            swipe_threshold_px: DEFAULT_SWIPE_THRESHOLD_PX,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            join_window_secs: DEFAULT_JOIN_WINDOW_SECS,
            recording_poll_secs: DEFAULT_RECORDING_POLL_SECS,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Load config from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TelemetryError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if !self.swipe_threshold_px.is_finite() || self.swipe_threshold_px < 0.0 {
            return Err(TelemetryError::ConfigError(format!(
                "swipe_threshold_px must be a non-negative number, got {}",
                self.swipe_threshold_px
            )));
        }
        if self.dedup_window_ms < 0 {
            return Err(TelemetryError::ConfigError(format!(
                "dedup_window_ms must be non-negative, got {}",
                self.dedup_window_ms
            )));
        }
        if self.join_window_secs < 0 {
            return Err(TelemetryError::ConfigError(format!(
                "join_window_secs must be non-negative, got {}",
                self.join_window_secs
            )));
        }
        if self.recording_poll_secs == 0 {
            return Err(TelemetryError::ConfigError(
                "recording_poll_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.dedup_window_ms)
    }

    pub fn join_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.join_window_secs)
    }

    pub fn recording_poll_interval(&self) -> Duration {
        Duration::from_secs(self.recording_poll_secs)
    }
}
