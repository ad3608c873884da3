//! Session telemetry data types
//!
//! This module defines the events captured during a session, the raw session
//! snapshot handed to enrichment, and the assembled session document that is
//! persisted and consumed by the feature extractor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Position in screen-local coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True for the (0,0) position reported by failed captures
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Size of the container a tap was captured in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    width: f64,
    height: f64,
}

impl ContainerSize {
    /// Returns `None` for degenerate (zero, negative or non-finite) sizes
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(width) && valid(height) {
            Some(Self { width, height })
        } else {
            None
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// One of the nine regions of a 3x3 grid laid over the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    /// Container size was unavailable, or the stored label was not recognised
    #[default]
    #[serde(other)]
    Unknown,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::TopLeft => "top_left",
            Zone::TopCenter => "top_center",
            Zone::TopRight => "top_right",
            Zone::MiddleLeft => "middle_left",
            Zone::Center => "center",
            Zone::MiddleRight => "middle_right",
            Zone::BottomLeft => "bottom_left",
            Zone::BottomCenter => "bottom_center",
            Zone::BottomRight => "bottom_right",
            Zone::Unknown => "unknown",
        }
    }
}

/// A single recorded tap
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TapEvent {
    /// Wall-clock time of the tap; `None` when a loaded log carried a bad value
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Monotonic offset from session start, immune to wall-clock changes
    #[serde(default, deserialize_with = "lenient_optional_u64")]
    pub monotonic_ms: Option<u64>,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: Position,
    #[serde(default)]
    pub zone: Zone,
}

/// A completed swipe gesture
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwipeEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_position: Position,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_position: Position,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration_ms: u64,
    /// Euclidean distance between start and end
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_px: f64,
    /// Distance over duration, with the duration clamped to at least 1ms
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed_px_per_ms: f64,
}

impl SwipeEvent {
    /// Build a swipe from its endpoints, taking the duration from the wall clock
    pub fn between(
        start_position: Position,
        start_time: DateTime<Utc>,
        end_position: Position,
        end_time: DateTime<Utc>,
    ) -> Self {
        let duration_ms = (end_time - start_time).num_milliseconds().max(0) as u64;
        Self::timed(start_position, start_time, end_position, end_time, duration_ms)
    }

    /// Build a swipe with an externally measured duration
    pub fn timed(
        start_position: Position,
        start_time: DateTime<Utc>,
        end_position: Position,
        end_time: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        let distance_px = start_position.distance_to(&end_position);
        let speed_px_per_ms = distance_px / duration_ms.max(1) as f64;

        Self {
            start_position,
            end_position,
            start_time: Some(start_time),
            end_time: Some(end_time),
            duration_ms,
            distance_px,
            speed_px_per_ms,
        }
    }
}

/// A navigation transition onto a screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenVisit {
    #[serde(default)]
    pub screen_name: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A screen visit annotated with the taps and swipes that happened around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedScreenVisit {
    #[serde(default)]
    pub screen_name: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub taps: Vec<TapEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub swipes: Vec<SwipeEvent>,
}

/// Business-flow markers; every transition is one-way within a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowFlags {
    #[serde(default, deserialize_with = "null_as_default")]
    pub fd_broken: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loan_taken: bool,
    #[serde(default)]
    pub transaction_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub login_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub fd_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub loan_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub transaction_start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub transaction_end_time: Option<DateTime<Utc>>,
}

/// Frozen raw state of a session, produced when the session ends
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tap_events: Vec<TapEvent>,
    #[serde(default, deserialize_with = "lenient_u64_list")]
    pub tap_durations_ms: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub swipe_events: Vec<SwipeEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screen_visits: Vec<ScreenVisit>,
    #[serde(default, deserialize_with = "lenient_f64_map")]
    pub screen_durations: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flow: FlowFlags,
}

impl SessionSnapshot {
    /// Elapsed session time in seconds, if both ends are known
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(elapsed_seconds(start, end).max(0.0)),
            _ => None,
        }
    }
}

/// Geographic point reported by the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Location context; absence is serialized explicitly, never omitted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationContext {
    Available {
        latitude: f64,
        longitude: f64,
    },
    #[default]
    Unavailable,
}

impl From<Option<GeoPoint>> for LocationContext {
    fn from(point: Option<GeoPoint>) -> Self {
        match point {
            Some(p) if p.latitude.is_finite() && p.longitude.is_finite() => {
                LocationContext::Available {
                    latitude: p.latitude,
                    longitude: p.longitude,
                }
            }
            _ => LocationContext::Unavailable,
        }
    }
}

/// Session identity and lifecycle timestamps
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub duration_seconds: Option<f64>,
}

/// Flow flags plus their login-relative offsets in seconds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInput {
    #[serde(flatten)]
    pub flags: FlowFlags,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub login_to_fd_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub login_to_loan_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub login_to_transaction_start_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub transaction_duration_seconds: Option<f64>,
}

impl SessionInput {
    pub fn from_flags(flags: FlowFlags) -> Self {
        let since_login = |at: Option<DateTime<Utc>>| match (flags.login_time, at) {
            (Some(login), Some(at)) => Some(elapsed_seconds(login, at)),
            _ => None,
        };
        let login_to_fd_seconds = since_login(flags.fd_time);
        let login_to_loan_seconds = since_login(flags.loan_time);
        let login_to_transaction_start_seconds = since_login(flags.transaction_start_time);
        let transaction_duration_seconds =
            match (flags.transaction_start_time, flags.transaction_end_time) {
                (Some(start), Some(end)) => Some(elapsed_seconds(start, end)),
                _ => None,
            };

        Self {
            flags,
            login_to_fd_seconds,
            login_to_loan_seconds,
            login_to_transaction_start_seconds,
            transaction_duration_seconds,
        }
    }
}

/// The assembled session record: persisted, re-loaded and fed to extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub session: SessionInfo,
    /// Opaque device-info passthrough
    #[serde(default = "unavailable_marker")]
    pub device: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: LocationContext,
    #[serde(default, deserialize_with = "lenient_u64_list")]
    pub tap_durations_ms: Vec<u64>,
    /// Filtered and deduplicated taps
    #[serde(default, deserialize_with = "null_as_default")]
    pub tap_events: Vec<TapEvent>,
    /// Taps exactly as recorded, before filtering and deduplication
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_tap_events: Vec<TapEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub swipe_events: Vec<SwipeEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screens_visited: Vec<EnrichedScreenVisit>,
    #[serde(default, deserialize_with = "lenient_f64_map")]
    pub screen_durations: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screen_recording_detected: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_input: SessionInput,
}

impl Default for SessionDocument {
    fn default() -> Self {
        Self {
            session: SessionInfo::default(),
            device: unavailable_marker(),
            location: LocationContext::Unavailable,
            tap_durations_ms: Vec::new(),
            tap_events: Vec::new(),
            raw_tap_events: Vec::new(),
            swipe_events: Vec::new(),
            screens_visited: Vec::new(),
            screen_durations: BTreeMap::new(),
            screen_recording_detected: false,
            session_input: SessionInput::default(),
        }
    }
}

/// Sentinel stored in place of missing collaborator context
pub fn unavailable_marker() -> Value {
    serde_json::json!({ "status": "unavailable" })
}

/// Signed seconds from `from` to `to`, at millisecond resolution
pub(crate) fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Accept RFC3339 strings or epoch milliseconds; anything else becomes `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp_value))
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Numeric leaves: null or non-numeric values read as 0 (or `None` when optional)

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_f64(deserializer)?.unwrap_or(0.0))
}

fn lenient_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_u64(deserializer)?.unwrap_or(0))
}

fn lenient_optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_as_u64))
}

fn lenient_u64_list<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| number_as_u64(v).unwrap_or(0))
            .collect(),
        _ => Vec::new(),
    };
    Ok(values)
}

fn lenient_f64_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(entries)) => entries
            .into_iter()
            .map(|(k, v)| {
                let seconds = v.as_f64().unwrap_or(0.0);
                (k, seconds)
            })
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(map)
}

/// Integers pass through; finite non-negative floats are rounded, negatives clamp to 0
fn number_as_u64(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| f.max(0.0).round() as u64)
}
