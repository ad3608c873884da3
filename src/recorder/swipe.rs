//! Swipe recorder
//!
//! Two-phase capture: pointer-down stores a pending start, pointer-up turns it
//! into a [`SwipeEvent`] when the pointer travelled further than the threshold
//! along either axis. Shorter movements are taps and are discarded here.

use crate::config::DEFAULT_SWIPE_THRESHOLD_PX;
use crate::types::{Position, SwipeEvent};
use chrono::{DateTime, Utc};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct PendingSwipe {
    position: Position,
    at: DateTime<Utc>,
    monotonic_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SwipeRecorder {
    threshold_px: f64,
    pending: Option<PendingSwipe>,
    events: Vec<SwipeEvent>,
}

impl Default for SwipeRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD_PX)
    }
}

impl SwipeRecorder {
    /// Create a recorder emitting swipes only for movements longer than
    /// `threshold_px` along the x or y axis
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px,
            pending: None,
            events: Vec::new(),
        }
    }

    /// Pointer-down. A second start before an end replaces the pending one.
    pub fn start(&mut self, position: Position, at: DateTime<Utc>, monotonic_ms: u64) {
        self.pending = Some(PendingSwipe {
            position,
            at,
            monotonic_ms,
        });
    }

    /// Pointer-up. Consumes the pending start and returns the emitted swipe, if any.
    /// The duration comes from the monotonic offsets; timestamps are kept for display.
    pub fn end(
        &mut self,
        position: Position,
        at: DateTime<Utc>,
        monotonic_ms: u64,
    ) -> Option<&SwipeEvent> {
        let pending = self.pending.take()?;

        let dx = (position.x - pending.position.x).abs();
        let dy = (position.y - pending.position.y).abs();
        if dx <= self.threshold_px && dy <= self.threshold_px {
            trace!(dx, dy, "movement below swipe threshold");
            return None;
        }

        let duration_ms = monotonic_ms.saturating_sub(pending.monotonic_ms);
        let swipe = SwipeEvent::timed(pending.position, pending.at, position, at, duration_ms);
        self.events.push(swipe);
        self.events.last()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn events(&self) -> &[SwipeEvent] {
        &self.events
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.events.clear();
    }

    pub fn into_events(self) -> Vec<SwipeEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_vertical_swipe_metrics() {
        let mut recorder = SwipeRecorder::default();
        recorder.start(Position::new(50.0, 100.0), t0(), 1_000);
        let swipe = recorder
            .end(Position::new(50.0, 140.0), t0() + Duration::milliseconds(200), 1_200)
            .cloned()
            .unwrap();

        assert_eq!(swipe.distance_px, 40.0);
        assert_eq!(swipe.duration_ms, 200);
        assert!((swipe.speed_px_per_ms - 0.2).abs() < 1e-12);
        assert_eq!(swipe.start_time, Some(t0()));
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_duration_ignores_wall_clock_jump() {
        let mut recorder = SwipeRecorder::default();
        recorder.start(Position::new(0.0, 0.0), t0(), 500);
        let swipe = recorder
            .end(Position::new(0.0, 100.0), t0() - Duration::hours(1), 750)
            .cloned()
            .unwrap();

        assert_eq!(swipe.duration_ms, 250);
        assert_eq!(swipe.speed_px_per_ms, 0.4);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut recorder = SwipeRecorder::default();

        recorder.start(Position::new(0.0, 100.0), t0(), 0);
        assert!(recorder.end(Position::new(0.0, 120.0), t0(), 0).is_none());

        recorder.start(Position::new(0.0, 100.0), t0(), 0);
        assert!(recorder.end(Position::new(0.0, 120.5), t0(), 0).is_some());

        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_diagonal_under_axis_threshold_is_not_swipe() {
        // About 21.2px of travel, but only 15px along each axis
        let mut recorder = SwipeRecorder::default();
        recorder.start(Position::new(100.0, 100.0), t0(), 0);
        assert!(recorder.end(Position::new(115.0, 115.0), t0(), 120).is_none());

        recorder.start(Position::new(100.0, 100.0), t0(), 0);
        let swipe = recorder
            .end(Position::new(75.0, 110.0), t0(), 120)
            .cloned()
            .unwrap();
        assert!((swipe.distance_px - 725.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_small_movements_never_emit() {
        let mut recorder = SwipeRecorder::default();
        for step in 0..20 {
            let offset = step as f64;
            recorder.start(Position::new(100.0, 100.0), t0(), 0);
            recorder.end(
                Position::new(100.0 + offset * 0.7, 100.0 - offset),
                t0(),
                10,
            );
        }
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let mut recorder = SwipeRecorder::default();
        assert!(recorder.end(Position::new(0.0, 500.0), t0(), 0).is_none());

        recorder.start(Position::new(0.0, 0.0), t0(), 0);
        assert!(recorder.end(Position::new(0.0, 500.0), t0(), 0).is_some());
        // The start was consumed by the first end
        assert!(!recorder.has_pending());
        assert!(recorder.end(Position::new(0.0, 900.0), t0(), 0).is_none());
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_zero_duration_speed_is_finite() {
        let mut recorder = SwipeRecorder::default();
        recorder.start(Position::new(0.0, 0.0), t0(), 40);
        let swipe = recorder
            .end(Position::new(0.0, 60.0), t0(), 40)
            .cloned()
            .unwrap();

        assert_eq!(swipe.duration_ms, 0);
        assert_eq!(swipe.speed_px_per_ms, 60.0);
    }

    #[test]
    fn test_custom_threshold() {
        let mut recorder = SwipeRecorder::new(50.0);
        recorder.start(Position::new(0.0, 0.0), t0(), 0);
        assert!(recorder.end(Position::new(0.0, 40.0), t0(), 0).is_none());
    }

    #[test]
    fn test_reset_drops_pending_and_events() {
        let mut recorder = SwipeRecorder::default();
        recorder.start(Position::new(0.0, 0.0), t0(), 0);
        recorder.end(Position::new(0.0, 100.0), t0(), 0);
        recorder.start(Position::new(0.0, 0.0), t0(), 0);
        recorder.reset();

        assert!(recorder.events().is_empty());
        assert!(!recorder.has_pending());
    }
}
