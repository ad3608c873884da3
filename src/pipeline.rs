//! Pipeline orchestration
//!
//! This module provides the public API for turning a finished session into a
//! persisted document and a feature vector.
//!
//! Flow: SessionSnapshot → Enrichment → Assembly → SessionDocument → Features

use crate::assembler::{CollaboratorContext, SessionAssembler};
use crate::collaborators::{DeviceInfoProvider, ExportSink, LocationProvider, ScoringModel};
use crate::config::TelemetryConfig;
use crate::enrichment::EnrichmentEngine;
use crate::error::TelemetryError;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::monitor::RecordingMonitor;
use crate::types::{SessionDocument, SessionSnapshot};
use tracing::{debug, info};

/// Extract the feature vector from session document JSON (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let features = document_to_features(&document_json)?;
/// ```
pub fn document_to_features(document_json: &str) -> Result<FeatureVector, TelemetryError> {
    let document = parse_document(document_json)?;
    Ok(FeatureExtractor::extract(&document))
}

/// Build a session document from snapshot JSON with default settings and no
/// collaborator context (stateless, one-shot).
pub fn snapshot_to_document(
    snapshot_json: &str,
    screen_recording_detected: bool,
) -> Result<SessionDocument, TelemetryError> {
    let snapshot = parse_snapshot(snapshot_json)?;
    Ok(SessionPipeline::default().finish(&snapshot, screen_recording_detected))
}

pub fn parse_document(json: &str) -> Result<SessionDocument, TelemetryError> {
    serde_json::from_str(json)
        .map_err(|e| TelemetryError::ParseError(format!("Failed to parse session document: {}", e)))
}

pub fn parse_snapshot(json: &str) -> Result<SessionSnapshot, TelemetryError> {
    serde_json::from_str(json)
        .map_err(|e| TelemetryError::ParseError(format!("Failed to parse session snapshot: {}", e)))
}

/// Session-end processing with collaborator context attached
pub struct SessionPipeline {
    config: TelemetryConfig,
    engine: EnrichmentEngine,
    location: Option<Box<dyn LocationProvider + Send + Sync>>,
    device_info: Option<Box<dyn DeviceInfoProvider + Send + Sync>>,
}

impl Default for SessionPipeline {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl SessionPipeline {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            engine: EnrichmentEngine::from_config(&config),
            config,
            location: None,
            device_info: None,
        }
    }

    pub fn with_location(mut self, provider: impl LocationProvider + Send + Sync + 'static) -> Self {
        self.location = Some(Box::new(provider));
        self
    }

    pub fn with_device_info(
        mut self,
        provider: impl DeviceInfoProvider + Send + Sync + 'static,
    ) -> Self {
        self.device_info = Some(Box::new(provider));
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Enrich a frozen session and assemble its document
    pub fn finish(
        &self,
        snapshot: &SessionSnapshot,
        screen_recording_detected: bool,
    ) -> SessionDocument {
        // Stage 1: Filter, dedup and time-join
        let enriched = self.engine.enrich(snapshot);

        // Stage 2: Gather collaborator context
        let context = CollaboratorContext {
            location: self.location.as_ref().and_then(|p| p.current_location()),
            device_info: self.device_info.as_ref().and_then(|p| p.device_info()),
            screen_recording_detected,
        };

        // Stage 3: Assemble
        let document = SessionAssembler::assemble(snapshot, enriched, context);
        info!(
            session_id = %document.session.session_id,
            taps = document.tap_events.len(),
            swipes = document.swipe_events.len(),
            screens = document.screens_visited.len(),
            "session document assembled"
        );
        document
    }

    /// Stop the recording monitor, then assemble with its latched result
    pub async fn finish_with_monitor(
        &self,
        snapshot: &SessionSnapshot,
        monitor: RecordingMonitor,
    ) -> SessionDocument {
        let detected = monitor.stop().await;
        self.finish(snapshot, detected)
    }

    pub fn export(
        &self,
        document: &SessionDocument,
        sink: &dyn ExportSink,
        logical_name: &str,
    ) -> Result<(), TelemetryError> {
        sink.write(document, logical_name)
    }

    pub fn extract(&self, document: &SessionDocument) -> FeatureVector {
        FeatureExtractor::extract(document)
    }

    /// Extract features and hand them to the scoring model
    pub fn score(
        &self,
        document: &SessionDocument,
        model: &dyn ScoringModel,
    ) -> Result<f64, TelemetryError> {
        let features = self.extract(document);
        let score = model.score(&features)?;
        debug!(session_id = %document.session.session_id, score, "session scored");
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ManualClock, MemorySink, RecordingDetector};
    use crate::session::SessionContext;
    use crate::types::{ContainerSize, GeoPoint, LocationContext, Position};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    fn recorded_session() -> SessionSnapshot {
        let config = TelemetryConfig::default();
        let clock = ManualClock::new(0);
        let mut ctx = SessionContext::start_with_clock(&config, t0(), Arc::new(clock.clone()));
        let screen = ContainerSize::new(300.0, 600.0);

        ctx.flow_mut().mark_login(t0());
        ctx.log_visit("Home", at(0));
        ctx.record_tap("Home", Position::new(10.0, 10.0), screen, at(0));
        clock.set(250);
        ctx.record_tap("Home", Position::new(10.0, 10.0), screen, at(250));
        clock.set(1_000);
        ctx.swipe_start(Position::new(50.0, 100.0), at(1_000));
        clock.set(1_200);
        ctx.swipe_end(Position::new(50.0, 140.0), at(1_200));
        ctx.record_screen_duration("Home", 5.0);

        ctx.log_visit("Loans", at(5_000));
        clock.set(6_000);
        ctx.record_tap("Loans", Position::new(150.0, 300.0), screen, at(6_000));
        ctx.flow_mut().mark_loan_taken(at(8_000));
        ctx.record_screen_duration("Loans", 15.0);

        ctx.end(at(20_000))
    }

    struct FixedModel;

    impl ScoringModel for FixedModel {
        fn score(&self, features: &FeatureVector) -> Result<f64, TelemetryError> {
            Ok(features.get(15).unwrap_or(0.0) * 0.9)
        }
    }

    struct AlwaysRecording;

    impl RecordingDetector for AlwaysRecording {
        fn is_recording(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_finish_builds_consistent_document() {
        let snapshot = recorded_session();
        let doc = SessionPipeline::default().finish(&snapshot, false);

        assert_eq!(doc.session.duration_seconds, Some(20.0));
        assert_eq!(doc.tap_durations_ms, vec![250, 5750]);
        assert_eq!(doc.raw_tap_events.len(), 3);
        assert_eq!(doc.tap_events.len(), 2);
        assert_eq!(doc.swipe_events.len(), 1);
        assert_eq!(doc.screens_visited.len(), 2);
        assert_eq!(doc.screens_visited[0].taps.len(), 1);
        assert_eq!(doc.screens_visited[1].taps.len(), 1);
        // The swipe falls within 30s of both visits
        assert_eq!(doc.screens_visited[0].swipes.len(), 1);
        assert_eq!(doc.screens_visited[1].swipes.len(), 1);
        assert_eq!(doc.session_input.login_to_loan_seconds, Some(8.0));
    }

    #[test]
    fn test_features_survive_persistence() {
        let pipeline = SessionPipeline::default();
        let doc = pipeline.finish(&recorded_session(), false);
        let sink = MemorySink::new();

        pipeline.export(&doc, &sink, "session").unwrap();
        let reloaded = sink.load("session").unwrap();

        assert_eq!(reloaded, doc);
        assert_eq!(pipeline.extract(&reloaded), pipeline.extract(&doc));
    }

    #[test]
    fn test_feature_values_for_recorded_session() {
        let pipeline = SessionPipeline::default();
        let features = pipeline.extract(&pipeline.finish(&recorded_session(), false));

        assert_eq!(features.get(0), Some(20.0));
        assert_eq!(features.get(1), Some(3000.0));
        assert_eq!(features.get(3), Some(0.1));
        assert_eq!(features.get(6), Some(40.0));
        assert_eq!(features.get(8), Some(170.0 / 3.0));
        assert_eq!(features.get(10), Some(40.0));
        assert_eq!(features.get(12), Some(10.0));
        assert_eq!(features.get(15), Some(1.0));
        assert_eq!(features.get(17), Some(8.0));
    }

    #[test]
    fn test_collaborator_context() {
        let mut info = Map::new();
        info.insert("model".to_string(), Value::from("SM-G991B"));
        let pipeline = SessionPipeline::default()
            .with_location(Some(GeoPoint {
                latitude: 19.07,
                longitude: 72.87,
            }))
            .with_device_info(info);

        let doc = pipeline.finish(&recorded_session(), true);
        assert_eq!(doc.device["model"], "SM-G991B");
        assert_eq!(
            doc.location,
            LocationContext::Available {
                latitude: 19.07,
                longitude: 72.87
            }
        );
        assert!(doc.screen_recording_detected);
    }

    #[test]
    fn test_score_uses_feature_vector() {
        let pipeline = SessionPipeline::default();
        let doc = pipeline.finish(&recorded_session(), false);
        let score = pipeline.score(&doc, &FixedModel).unwrap();
        assert!((score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_document_to_features_stateless() {
        let doc = SessionPipeline::default().finish(&recorded_session(), false);
        let json = serde_json::to_string(&doc).unwrap();

        let features = document_to_features(&json).unwrap();
        assert_eq!(features, FeatureExtractor::extract(&doc));
    }

    #[test]
    fn test_snapshot_to_document_stateless() {
        let json = r#"{
            "session_id": "sess-json",
            "start_time": "2024-01-15T14:00:00Z",
            "end_time": "2024-01-15T14:01:00Z",
            "tap_events": [
                { "timestamp": "2024-01-15T14:00:00Z", "screen_name": "Home",
                  "position": { "x": 10.0, "y": 10.0 }, "zone": "top_left" },
                { "timestamp": "2024-01-15T14:00:00.250Z", "screen_name": "Home",
                  "position": { "x": 10.0, "y": 10.0 }, "zone": "top_left" },
                { "timestamp": "not a time", "screen_name": "Home",
                  "position": { "x": 0.0, "y": 0.0 }, "zone": "unknown" }
            ],
            "tap_durations_ms": [250],
            "screen_visits": [
                { "screen_name": "Home", "timestamp": "2024-01-15T14:00:00Z" }
            ]
        }"#;

        let doc = snapshot_to_document(json, false).unwrap();
        assert_eq!(doc.session.duration_seconds, Some(60.0));
        assert_eq!(doc.tap_events.len(), 1);
        assert_eq!(doc.raw_tap_events.len(), 3);
        assert_eq!(doc.screens_visited[0].taps.len(), 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(document_to_features("not valid json").is_err());
        assert!(snapshot_to_document("{", false).is_err());
    }

    #[test]
    fn test_partial_document_degrades_to_zero() {
        let features = document_to_features(r#"{ "session": { "duration_seconds": null } }"#).unwrap();
        assert!(features.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_null_numeric_fields_degrade_to_zero() {
        let features =
            document_to_features(r#"{"screen_durations":{"Home":null,"Pay":4.0}}"#).unwrap();
        assert_eq!(features.get(12), Some(2.0));

        let json = r#"{
            "raw_tap_events": [
                { "screen_name": "Home", "position": { "x": null, "y": 20.0 } },
                { "screen_name": "Home", "position": { "x": 40.0, "y": 40.0 } }
            ],
            "swipe_events": [
                { "distance_px": null, "speed_px_per_ms": 0.5, "duration_ms": 80.0 }
            ],
            "tap_durations_ms": [250.0],
            "session": { "duration_seconds": null }
        }"#;
        let doc = parse_document(json).unwrap();
        assert_eq!(doc.tap_durations_ms, vec![250]);
        assert_eq!(doc.swipe_events[0].duration_ms, 80);

        let features = document_to_features(json).unwrap();
        assert_eq!(features.get(1), Some(250.0));
        assert_eq!(features.get(4), Some(0.5));
        assert_eq!(features.get(6), Some(0.0));
        assert_eq!(features.get(8), Some(20.0));
        assert_eq!(features.get(9), Some(30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_with_monitor_reads_latched_flag() {
        let pipeline = SessionPipeline::default();
        let monitor = RecordingMonitor::spawn(
            Arc::new(AlwaysRecording),
            pipeline.config().recording_poll_interval(),
        );
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let doc = pipeline.finish_with_monitor(&recorded_session(), monitor).await;
        assert!(doc.screen_recording_detected);
    }
}
