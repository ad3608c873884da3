//! External collaborator seams
//!
//! The pipeline never talks to GPS, device APIs, the OS recording detector,
//! storage or the scoring model directly. Hosts plug implementations of these
//! traits in.

use crate::error::TelemetryError;
use crate::features::FeatureVector;
use crate::types::{GeoPoint, SessionDocument};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

/// Source of the device's current location
pub trait LocationProvider {
    fn current_location(&self) -> Option<GeoPoint>;
}

/// Source of opaque device information, passed through unmodified
pub trait DeviceInfoProvider {
    fn device_info(&self) -> Option<Map<String, Value>>;
}

/// Reports whether the screen is currently being recorded or mirrored
pub trait RecordingDetector: Send + Sync {
    fn is_recording(&self) -> bool;
}

/// Destination for finished session documents
pub trait ExportSink {
    fn write(&self, document: &SessionDocument, logical_name: &str) -> Result<(), TelemetryError>;
}

/// Risk model consuming the fixed-order feature vector
pub trait ScoringModel {
    fn score(&self, features: &FeatureVector) -> Result<f64, TelemetryError>;
}

/// Monotonic time source for inter-event timing
pub trait MonotonicClock: Send + Sync + fmt::Debug {
    /// Milliseconds since an arbitrary fixed origin; never decreases
    fn now_ms(&self) -> u64;
}

/// Monotonic clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Host-driven clock. Clones share the same time, which can only move forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move the clock to `ms`; earlier values are ignored
    pub fn set(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl LocationProvider for Option<GeoPoint> {
    fn current_location(&self) -> Option<GeoPoint> {
        *self
    }
}

impl DeviceInfoProvider for Map<String, Value> {
    fn device_info(&self) -> Option<Map<String, Value>> {
        Some(self.clone())
    }
}

/// Writes each document as pretty-printed JSON to `<dir>/<logical_name>.json`
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, logical_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", logical_name))
    }

    /// Re-load a previously written document
    pub fn load(&self, logical_name: &str) -> Result<SessionDocument, TelemetryError> {
        load_document(&self.path_for(logical_name))
    }
}

impl ExportSink for JsonFileSink {
    fn write(&self, document: &SessionDocument, logical_name: &str) -> Result<(), TelemetryError> {
        validate_logical_name(logical_name)?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(logical_name);
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(&path, json)?;

        info!(path = %path.display(), "session document written");
        Ok(())
    }
}

/// Keeps serialized documents in memory, keyed by logical name
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<HashMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, logical_name: &str) -> Result<SessionDocument, TelemetryError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| TelemetryError::ExportError("memory sink lock poisoned".to_string()))?;
        let json = documents.get(logical_name).ok_or_else(|| {
            TelemetryError::ExportError(format!("no document named {}", logical_name))
        })?;
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExportSink for MemorySink {
    fn write(&self, document: &SessionDocument, logical_name: &str) -> Result<(), TelemetryError> {
        validate_logical_name(logical_name)?;
        let json = serde_json::to_string(document)?;
        self.documents
            .lock()
            .map_err(|_| TelemetryError::ExportError("memory sink lock poisoned".to_string()))?
            .insert(logical_name.to_string(), json);
        Ok(())
    }
}

/// Read a session document from a JSON file
pub fn load_document(path: &Path) -> Result<SessionDocument, TelemetryError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        TelemetryError::ParseError(format!(
            "Failed to parse session document {}: {}",
            path.display(),
            e
        ))
    })
}

fn validate_logical_name(name: &str) -> Result<(), TelemetryError> {
    let invalid = name.is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if invalid {
        return Err(TelemetryError::ExportError(format!(
            "invalid logical name: {:?}",
            name
        )));
    }
    Ok(())
}
