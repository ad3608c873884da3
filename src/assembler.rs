//! Session document assembly
//!
//! Merges the frozen session, the enrichment output and collaborator context
//! into the single document that is persisted and scored.

use crate::enrichment::EnrichedEvents;
use crate::types::{
    unavailable_marker, GeoPoint, LocationContext, SessionDocument, SessionInfo, SessionInput,
    SessionSnapshot,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Collaborator-supplied context for one session
#[derive(Debug, Clone, Default)]
pub struct CollaboratorContext {
    pub location: Option<GeoPoint>,
    pub device_info: Option<Map<String, Value>>,
    pub screen_recording_detected: bool,
}

pub struct SessionAssembler;

impl SessionAssembler {
    /// Build the session document. Missing context is replaced by explicit
    /// "unavailable" markers; assembly itself never fails.
    pub fn assemble(
        snapshot: &SessionSnapshot,
        enriched: EnrichedEvents,
        context: CollaboratorContext,
    ) -> SessionDocument {
        let session = SessionInfo {
            session_id: snapshot.session_id.clone(),
            start_time: snapshot.start_time,
            end_time: snapshot.end_time,
            duration_seconds: snapshot.duration_seconds(),
        };

        let device = match context.device_info {
            Some(info) => Value::Object(info),
            None => unavailable_marker(),
        };

        debug!(
            session_id = %snapshot.session_id,
            location_available = context.location.is_some(),
            screen_recording_detected = context.screen_recording_detected,
            "assembling session document"
        );

        SessionDocument {
            session,
            device,
            location: LocationContext::from(context.location),
            tap_durations_ms: snapshot.tap_durations_ms.clone(),
            tap_events: enriched.taps,
            raw_tap_events: snapshot.tap_events.clone(),
            swipe_events: snapshot.swipe_events.clone(),
            screens_visited: enriched.screens_visited,
            screen_durations: snapshot.screen_durations.clone(),
            screen_recording_detected: context.screen_recording_detected,
            session_input: SessionInput::from_flags(snapshot.flow.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentEngine;
    use crate::types::{Position, ScreenVisit, TapEvent, Zone};
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot() -> SessionSnapshot {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let tap = |ms: i64| TapEvent {
            timestamp: Some(t0 + Duration::milliseconds(ms)),
            monotonic_ms: None,
            screen_name: "Home".to_string(),
            position: Position::new(10.0, 10.0),
            zone: Zone::TopLeft,
        };

        SessionSnapshot {
            session_id: "sess-42".to_string(),
            start_time: Some(t0),
            end_time: Some(t0 + Duration::seconds(120)),
            tap_events: vec![tap(0), tap(250)],
            tap_durations_ms: vec![250],
            screen_visits: vec![ScreenVisit {
                screen_name: "Home".to_string(),
                timestamp: Some(t0),
            }],
            ..SessionSnapshot::default()
        }
    }

    #[test]
    fn test_assemble_with_missing_context() {
        let snapshot = snapshot();
        let enriched = EnrichmentEngine::default().enrich(&snapshot);
        let doc = SessionAssembler::assemble(&snapshot, enriched, CollaboratorContext::default());

        assert_eq!(doc.session.session_id, "sess-42");
        assert_eq!(doc.session.duration_seconds, Some(120.0));
        assert_eq!(doc.location, LocationContext::Unavailable);
        assert_eq!(doc.device, unavailable_marker());
        assert_eq!(doc.tap_events.len(), 1);
        assert_eq!(doc.raw_tap_events.len(), 2);
        assert_eq!(doc.tap_durations_ms, vec![250]);
        assert!(!doc.screen_recording_detected);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["location"]["status"], "unavailable");
        assert_eq!(json["device"]["status"], "unavailable");
    }

    #[test]
    fn test_assemble_passes_device_info_through() {
        let snapshot = snapshot();
        let enriched = EnrichmentEngine::default().enrich(&snapshot);
        let mut info = Map::new();
        info.insert("os".to_string(), Value::from("android"));
        info.insert("sdk".to_string(), Value::from(34));

        let doc = SessionAssembler::assemble(
            &snapshot,
            enriched,
            CollaboratorContext {
                location: Some(GeoPoint {
                    latitude: 28.61,
                    longitude: 77.21,
                }),
                device_info: Some(info.clone()),
                screen_recording_detected: true,
            },
        );

        assert_eq!(doc.device, Value::Object(info));
        assert!(matches!(doc.location, LocationContext::Available { .. }));
        assert!(doc.screen_recording_detected);
    }

    #[test]
    fn test_document_top_level_fields() {
        let snapshot = snapshot();
        let enriched = EnrichmentEngine::default().enrich(&snapshot);
        let doc = SessionAssembler::assemble(&snapshot, enriched, CollaboratorContext::default());
        let json = serde_json::to_value(&doc).unwrap();

        for field in [
            "session",
            "device",
            "location",
            "tap_durations_ms",
            "tap_events",
            "swipe_events",
            "screens_visited",
            "screen_durations",
            "screen_recording_detected",
            "session_input",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["session_input"]["fd_broken"], false);
    }
}
