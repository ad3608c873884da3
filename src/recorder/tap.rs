//! Tap capture and inter-tap timing

use crate::types::{Position, TapEvent, Zone};
use chrono::{DateTime, Utc};

/// Records taps in order along with the monotonic gap between consecutive taps
#[derive(Debug, Clone, Default)]
pub struct TapRecorder {
    events: Vec<TapEvent>,
    durations_ms: Vec<u64>,
    last_tap_ms: Option<u64>,
}

impl TapRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tap. `monotonic_ms` is the offset from session start and
    /// drives the inter-tap gap, so wall-clock jumps never distort it.
    pub fn record_tap(
        &mut self,
        screen_name: &str,
        position: Position,
        zone: Zone,
        timestamp: DateTime<Utc>,
        monotonic_ms: u64,
    ) -> &TapEvent {
        if let Some(previous) = self.last_tap_ms {
            self.durations_ms.push(monotonic_ms.saturating_sub(previous));
        }
        self.last_tap_ms = Some(monotonic_ms);

        self.events.push(TapEvent {
            timestamp: Some(timestamp),
            monotonic_ms: Some(monotonic_ms),
            screen_name: screen_name.to_string(),
            position,
            zone,
        });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[TapEvent] {
        &self.events
    }

    pub fn durations_ms(&self) -> &[u64] {
        &self.durations_ms
    }

    pub fn tap_count(&self) -> usize {
        self.events.len()
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.durations_ms.clear();
        self.last_tap_ms = None;
    }

    pub fn into_parts(self) -> (Vec<TapEvent>, Vec<u64>) {
        (self.events, self.durations_ms)
    }
}
