//! Risk feature extraction
//!
//! Reduces a session document to the fixed 19-value vector consumed by the
//! risk-scoring model. Extraction is a pure function of the document: the same
//! document always yields a bit-identical vector, and missing fields degrade
//! to zeroed features instead of failing.

use crate::types::SessionDocument;
use serde::{Deserialize, Serialize};

/// Number of features in the vector
pub const FEATURE_COUNT: usize = 19;

/// Feature names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "session_duration_sec",
    "tap_duration_mean_ms",
    "tap_duration_std_ms",
    "tap_frequency",
    "swipe_speed_mean",
    "swipe_speed_std",
    "swipe_distance_mean",
    "swipe_distance_std",
    "tap_x_mean",
    "tap_y_mean",
    "screen_swipe_distance_mean",
    "screen_swipe_speed_mean",
    "screen_duration_mean_sec",
    "screen_duration_std_sec",
    "fd_broken",
    "loan_taken",
    "login_to_fd_sec",
    "login_to_loan_sec",
    "login_to_transaction_sec",
];

/// Fixed-order numeric summary of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// (name, value) pairs in vector order
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied()).collect()
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.to_vec()
    }
}

/// Feature extractor for session documents
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract the feature vector from a session document
    pub fn extract(document: &SessionDocument) -> FeatureVector {
        let session_duration = document.session.duration_seconds.unwrap_or(0.0);

        // Tap rhythm
        let tap_durations: Vec<f64> = document.tap_durations_ms.iter().map(|&d| d as f64).collect();
        let tap_frequency =
            compute_tap_frequency(document.tap_durations_ms.len(), session_duration);

        // Global swipe list
        let swipe_speeds: Vec<f64> = document
            .swipe_events
            .iter()
            .map(|s| s.speed_px_per_ms)
            .collect();
        let swipe_distances: Vec<f64> =
            document.swipe_events.iter().map(|s| s.distance_px).collect();

        // Tap centroid over taps as recorded, before dedup
        let centroid_source = if document.raw_tap_events.is_empty() {
            &document.tap_events
        } else {
            &document.raw_tap_events
        };
        let tap_xs: Vec<f64> = centroid_source.iter().map(|t| t.position.x).collect();
        let tap_ys: Vec<f64> = centroid_source.iter().map(|t| t.position.y).collect();

        // Swipes nested under screen visits (a swipe may count once per visit)
        let nested_swipes = document.screens_visited.iter().flat_map(|v| v.swipes.iter());
        let (nested_distances, nested_speeds): (Vec<f64>, Vec<f64>) = nested_swipes
            .map(|s| (s.distance_px, s.speed_px_per_ms))
            .unzip();

        let screen_durations: Vec<f64> = document.screen_durations.values().copied().collect();

        let input = &document.session_input;

        let values = [
            session_duration,
            mean(&tap_durations),
            sample_std(&tap_durations),
            tap_frequency,
            mean(&swipe_speeds),
            sample_std(&swipe_speeds),
            mean(&swipe_distances),
            sample_std(&swipe_distances),
            mean(&tap_xs),
            mean(&tap_ys),
            mean(&nested_distances),
            mean(&nested_speeds),
            mean(&screen_durations),
            sample_std(&screen_durations),
            flag_value(input.flags.fd_broken),
            flag_value(input.flags.loan_taken),
            input.login_to_fd_seconds.unwrap_or(0.0),
            input.login_to_loan_seconds.unwrap_or(0.0),
            input.login_to_transaction_start_seconds.unwrap_or(0.0),
        ];

        FeatureVector(values.map(finite_or_zero))
    }
}

/// Arithmetic mean; 0 for an empty set
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with the n-1 divisor; 0 for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Gaps per second, with the session length clamped to at least one second
fn compute_tap_frequency(gap_count: usize, session_duration_sec: f64) -> f64 {
    gap_count as f64 / session_duration_sec.max(1.0)
}

fn flag_value(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
