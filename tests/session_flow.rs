//! Integration test: record a session, assemble, persist, reload, extract features.

use chrono::{DateTime, Duration, TimeZone, Utc};
use session_sentinel::collaborators::{ExportSink, JsonFileSink, ManualClock, ScoringModel};
use session_sentinel::types::{ContainerSize, GeoPoint, LocationContext, Position, Zone};
use session_sentinel::{
    document_to_features, validate_document, FeatureVector, SessionContext, SessionPipeline,
    TelemetryConfig, TelemetryError, FEATURE_COUNT,
};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + Duration::milliseconds(ms)
}

struct ThresholdModel;

impl ScoringModel for ThresholdModel {
    fn score(&self, features: &FeatureVector) -> Result<f64, TelemetryError> {
        if features.as_slice().len() != FEATURE_COUNT {
            return Err(TelemetryError::ScoringError("bad vector".to_string()));
        }
        Ok(if features.get(14) == Some(1.0) { 0.95 } else { 0.05 })
    }
}

#[test]
fn recorded_session_survives_persistence() {
    let config = TelemetryConfig::default();
    let screen = ContainerSize::new(360.0, 720.0);
    let clock = ManualClock::new(0);
    let mut ctx = SessionContext::start_with_clock(&config, t0(), Arc::new(clock.clone()));

    ctx.flow_mut().mark_login(t0());
    ctx.log_visit("Home", at(0));
    assert_eq!(
        ctx.record_tap("Home", Position::new(10.0, 10.0), screen, at(0)),
        Zone::TopLeft
    );
    clock.set(250);
    ctx.record_tap("Home", Position::new(10.0, 10.0), screen, at(250));
    clock.set(400);
    ctx.swipe_start(Position::new(100.0, 100.0), at(400));
    clock.set(600);
    assert!(ctx.swipe_end(Position::new(100.0, 140.0), at(600)).is_some());
    ctx.record_screen_duration("Home", 4.0);

    ctx.log_visit("FixedDeposits", at(4_000));
    clock.set(5_000);
    ctx.record_tap("FixedDeposits", Position::new(180.0, 360.0), screen, at(5_000));
    clock.set(6_000);
    ctx.record_tap("FixedDeposits", Position::new(200.0, 700.0), None, at(6_000));
    ctx.flow_mut().mark_fd_broken(at(7_000));
    ctx.record_screen_duration("FixedDeposits", 9.0);

    let snapshot = ctx.end(at(13_000));

    let pipeline = SessionPipeline::new(config).with_location(Some(GeoPoint {
        latitude: 12.97,
        longitude: 77.59,
    }));
    let document = pipeline.finish(&snapshot, false);

    assert_eq!(document.tap_durations_ms, vec![250, 4750, 1000]);
    assert_eq!(document.tap_events.len(), 3);
    assert_eq!(document.tap_events[1].zone, Zone::Center);
    assert_eq!(document.tap_events[2].zone, Zone::Unknown);
    assert_eq!(document.swipe_events[0].speed_px_per_ms, 0.2);
    assert!(matches!(document.location, LocationContext::Available { .. }));

    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    sink.write(&document, "session-1").unwrap();
    let reloaded = sink.load("session-1").unwrap();
    assert_eq!(reloaded, document);

    let json = std::fs::read_to_string(sink.path_for("session-1")).unwrap();
    let features = document_to_features(&json).unwrap();
    assert_eq!(features, pipeline.extract(&document));

    assert_eq!(features.get(0), Some(13.0));
    assert_eq!(features.get(4), Some(0.2));
    assert_eq!(features.get(14), Some(1.0));
    assert_eq!(features.get(16), Some(7.0));
    assert_eq!(pipeline.score(&reloaded, &ThresholdModel).unwrap(), 0.95);

    // Only the unmeasured tap is flagged
    let issues = validate_document(&reloaded);
    assert_eq!(issues.len(), 1);
}

#[test]
fn empty_session_yields_zero_vector_with_flags() {
    let config = TelemetryConfig::default();
    let mut ctx = SessionContext::start(&config, t0());
    ctx.flow_mut().mark_loan_taken(t0());
    let snapshot = ctx.end(t0());

    let document = SessionPipeline::new(config).finish(&snapshot, false);
    let features = session_sentinel::FeatureExtractor::extract(&document);

    for (i, value) in features.as_slice().iter().enumerate() {
        let expected = if i == 15 { 1.0 } else { 0.0 };
        assert_eq!(*value, expected, "feature {}", i);
    }
}

#[test]
fn config_file_changes_swipe_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentinel.json");
    std::fs::write(&path, r#"{ "swipe_threshold_px": 50.0 }"#).unwrap();

    let config = TelemetryConfig::load(&path).unwrap();
    let mut ctx = SessionContext::start(&config, t0());
    ctx.swipe_start(Position::new(0.0, 100.0), at(0));
    assert!(ctx.swipe_end(Position::new(0.0, 140.0), at(200)).is_none());

    let snapshot = ctx.end(at(1_000));
    assert!(snapshot.swipe_events.is_empty());
}
