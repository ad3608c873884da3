//! Session enrichment
//!
//! Turns a raw session snapshot into clean, time-correlated event lists:
//! capture failures are filtered out, repeated taps collapse into one, and
//! taps and swipes are joined onto the screen visits they happened around.

use crate::config::TelemetryConfig;
use crate::types::{EnrichedScreenVisit, ScreenVisit, SessionSnapshot, SwipeEvent, TapEvent, Zone};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Output of the enrichment pass
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedEvents {
    /// Filtered, deduplicated taps in original order
    pub taps: Vec<TapEvent>,
    pub screens_visited: Vec<EnrichedScreenVisit>,
}

/// Enrichment windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentEngine {
    dedup_window: Duration,
    join_window: Duration,
}

impl Default for EnrichmentEngine {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}

impl EnrichmentEngine {
    pub fn new(dedup_window: Duration, join_window: Duration) -> Self {
        Self {
            dedup_window,
            join_window,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.dedup_window(), config.join_window())
    }

    /// Run filter, dedup and time-join over a frozen session
    pub fn enrich(&self, snapshot: &SessionSnapshot) -> EnrichedEvents {
        let filtered = filter_taps(&snapshot.tap_events);
        let taps = dedup_taps(&filtered, self.dedup_window);
        let screens_visited = join_visits(
            &snapshot.screen_visits,
            &taps,
            &snapshot.swipe_events,
            self.join_window,
        );

        debug!(
            session_id = %snapshot.session_id,
            raw_taps = snapshot.tap_events.len(),
            filtered_taps = filtered.len(),
            kept_taps = taps.len(),
            visits = screens_visited.len(),
            "session enriched"
        );

        EnrichedEvents {
            taps,
            screens_visited,
        }
    }
}

/// Drop taps at exactly (0,0) whose zone is unknown; those are capture failures
pub fn filter_taps(taps: &[TapEvent]) -> Vec<TapEvent> {
    taps.iter()
        .filter(|tap| !(tap.position.is_origin() && tap.zone == Zone::Unknown))
        .cloned()
        .collect()
}

/// Keep a tap unless an earlier kept tap has the same screen, zone and
/// position and lies within `window` of it (inclusive)
pub fn dedup_taps(taps: &[TapEvent], window: Duration) -> Vec<TapEvent> {
    let mut kept: Vec<TapEvent> = Vec::with_capacity(taps.len());

    for tap in taps {
        let duplicate = kept.iter().any(|earlier| is_duplicate(earlier, tap, window));
        if !duplicate {
            kept.push(tap.clone());
        }
    }

    kept
}

fn is_duplicate(earlier: &TapEvent, tap: &TapEvent, window: Duration) -> bool {
    if earlier.screen_name != tap.screen_name
        || earlier.zone != tap.zone
        || earlier.position != tap.position
    {
        return false;
    }
    match (earlier.timestamp, tap.timestamp) {
        (Some(a), Some(b)) => within(a, b, window),
        // Without both times there is no evidence of a repeat
        _ => false,
    }
}

/// Attach to every visit the same-screen taps and all swipes within `window`
pub fn join_visits(
    visits: &[ScreenVisit],
    taps: &[TapEvent],
    swipes: &[SwipeEvent],
    window: Duration,
) -> Vec<EnrichedScreenVisit> {
    visits
        .iter()
        .map(|visit| {
            let (visit_taps, visit_swipes) = match visit.timestamp {
                Some(at) => (
                    taps.iter()
                        .filter(|tap| tap.screen_name == visit.screen_name)
                        .filter(|tap| tap.timestamp.is_some_and(|t| within(at, t, window)))
                        .cloned()
                        .collect(),
                    swipes
                        .iter()
                        .filter(|swipe| swipe.start_time.is_some_and(|t| within(at, t, window)))
                        .cloned()
                        .collect(),
                ),
                None => (Vec::new(), Vec::new()),
            };

            EnrichedScreenVisit {
                screen_name: visit.screen_name.clone(),
                timestamp: visit.timestamp,
                taps: visit_taps,
                swipes: visit_swipes,
            }
        })
        .collect()
}

/// Symmetric, boundary-inclusive window test
fn within(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    let delta = b - a;
    delta >= -window && delta <= window
}
