//! Navigation and screen-duration tracking

use crate::types::ScreenVisit;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct NavigationRecorder {
    visits: Vec<ScreenVisit>,
    durations: BTreeMap<String, f64>,
}

impl NavigationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_visit(&mut self, screen: &str, timestamp: DateTime<Utc>) {
        self.visits.push(ScreenVisit {
            screen_name: screen.to_string(),
            timestamp: Some(timestamp),
        });
    }

    /// Add `seconds` to the running total for `screen`
    pub fn record_duration(&mut self, screen: &str, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(screen, seconds, "ignoring invalid screen duration");
            return;
        }
        *self.durations.entry(screen.to_string()).or_insert(0.0) += seconds;
    }

    pub fn visits(&self) -> &[ScreenVisit] {
        &self.visits
    }

    pub fn durations(&self) -> &BTreeMap<String, f64> {
        &self.durations
    }

    pub fn reset(&mut self) {
        self.visits.clear();
        self.durations.clear();
    }

    pub fn into_parts(self) -> (Vec<ScreenVisit>, BTreeMap<String, f64>) {
        (self.visits, self.durations)
    }
}
