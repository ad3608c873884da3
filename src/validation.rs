//! Structural checks on persisted session documents
//!
//! Documents are always usable by the feature extractor; these checks only
//! report content that will silently degrade features so hosts can spot
//! instrumentation bugs.

use crate::types::{SessionDocument, Zone};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentIssue {
    #[error("Session is missing its {field}")]
    MissingSessionTime { field: &'static str },

    #[error("Session duration is out of range: {value}")]
    DurationOutOfRange { value: f64 },

    #[error("{list}[{index}] has no usable timestamp")]
    MissingTimestamp { list: &'static str, index: usize },

    #[error("{count} tap(s) have an unknown zone")]
    UnknownZones { count: usize },

    #[error("swipe_events[{index}] has an invalid {field}: {value}")]
    InvalidSwipe {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Screen '{screen}' has an invalid duration: {value}")]
    InvalidScreenDuration { screen: String, value: f64 },

    #[error("Expected {expected} tap gaps for the recorded taps, found {actual}")]
    TapGapMismatch { expected: usize, actual: usize },
}

/// Collect every issue in `document`; an empty list means the document is clean
pub fn validate_document(document: &SessionDocument) -> Vec<DocumentIssue> {
    let mut issues = Vec::new();

    let session = &document.session;
    if session.start_time.is_none() {
        issues.push(DocumentIssue::MissingSessionTime {
            field: "start_time",
        });
    }
    if session.end_time.is_none() {
        issues.push(DocumentIssue::MissingSessionTime { field: "end_time" });
    }
    if let Some(value) = session.duration_seconds {
        if !value.is_finite() || value < 0.0 {
            issues.push(DocumentIssue::DurationOutOfRange { value });
        }
    }

    for (index, tap) in document.raw_tap_events.iter().enumerate() {
        if tap.timestamp.is_none() {
            issues.push(DocumentIssue::MissingTimestamp {
                list: "raw_tap_events",
                index,
            });
        }
    }

    let unknown = document
        .raw_tap_events
        .iter()
        .filter(|t| t.zone == Zone::Unknown)
        .count();
    if unknown > 0 {
        issues.push(DocumentIssue::UnknownZones { count: unknown });
    }

    for (index, swipe) in document.swipe_events.iter().enumerate() {
        if swipe.start_time.is_none() {
            issues.push(DocumentIssue::MissingTimestamp {
                list: "swipe_events",
                index,
            });
        }
        for (field, value) in [
            ("distance_px", swipe.distance_px),
            ("speed_px_per_ms", swipe.speed_px_per_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                issues.push(DocumentIssue::InvalidSwipe {
                    index,
                    field,
                    value,
                });
            }
        }
    }

    for (index, visit) in document.screens_visited.iter().enumerate() {
        if visit.timestamp.is_none() {
            issues.push(DocumentIssue::MissingTimestamp {
                list: "screens_visited",
                index,
            });
        }
    }

    for (screen, &value) in &document.screen_durations {
        if !value.is_finite() || value < 0.0 {
            issues.push(DocumentIssue::InvalidScreenDuration {
                screen: screen.clone(),
                value,
            });
        }
    }

    if !document.raw_tap_events.is_empty() {
        let expected = document.raw_tap_events.len() - 1;
        let actual = document.tap_durations_ms.len();
        if expected != actual {
            issues.push(DocumentIssue::TapGapMismatch { expected, actual });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, SwipeEvent, TapEvent};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn clean_document() -> SessionDocument {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let mut doc = SessionDocument::default();
        doc.session.start_time = Some(t0);
        doc.session.end_time = Some(t0);
        doc.session.duration_seconds = Some(0.0);
        doc.raw_tap_events = vec![TapEvent {
            timestamp: Some(t0),
            monotonic_ms: Some(0),
            screen_name: "Home".to_string(),
            position: Position::new(5.0, 5.0),
            zone: Zone::TopLeft,
        }];
        doc
    }

    #[test]
    fn test_clean_document_has_no_issues() {
        assert_eq!(validate_document(&clean_document()), vec![]);
    }

    #[test]
    fn test_reports_missing_and_out_of_range_values() {
        let mut doc = clean_document();
        doc.session.end_time = None;
        doc.session.duration_seconds = Some(-3.0);
        doc.raw_tap_events.push(TapEvent::default());
        doc.screen_durations.insert("Pay".to_string(), f64::NAN);

        let issues = validate_document(&doc);
        assert!(issues.contains(&DocumentIssue::MissingSessionTime { field: "end_time" }));
        assert!(issues.contains(&DocumentIssue::DurationOutOfRange { value: -3.0 }));
        assert!(issues.contains(&DocumentIssue::MissingTimestamp {
            list: "raw_tap_events",
            index: 1
        }));
        assert!(issues.contains(&DocumentIssue::UnknownZones { count: 1 }));
        assert!(issues.contains(&DocumentIssue::TapGapMismatch {
            expected: 1,
            actual: 0
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, DocumentIssue::InvalidScreenDuration { screen, .. } if screen == "Pay")));
    }

    #[test]
    fn test_reports_invalid_swipes() {
        let mut doc = clean_document();
        doc.swipe_events = vec![SwipeEvent {
            distance_px: -1.0,
            ..SwipeEvent::default()
        }];

        let issues = validate_document(&doc);
        assert_eq!(
            issues,
            vec![
                DocumentIssue::MissingTimestamp {
                    list: "swipe_events",
                    index: 0
                },
                DocumentIssue::InvalidSwipe {
                    index: 0,
                    field: "distance_px",
                    value: -1.0
                },
            ]
        );
        assert_eq!(issues[1].to_string(), "swipe_events[0] has an invalid distance_px: -1");
    }
}
