//! Session lifecycle and the per-session recording context
//!
//! A [`SessionContext`] is created by the host when a session starts and owns
//! every recorder for that session. Ending the session consumes the context,
//! so no recorder can be mutated after the end barrier.

use crate::collaborators::{MonotonicClock, SystemClock};
use crate::config::TelemetryConfig;
use crate::recorder::{FlowRecorder, NavigationRecorder, SwipeRecorder, TapRecorder};
use crate::types::{elapsed_seconds, ContainerSize, Position, SessionSnapshot, SwipeEvent, Zone};
use crate::zone::zone_for;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Start/end timestamps of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLifecycle {
    session_id: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl SessionLifecycle {
    pub fn start(at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            start_time: at,
            end_time: None,
        }
    }

    /// Record the end time; only the first call has an effect
    pub fn end(&mut self, at: DateTime<Utc>) {
        if self.end_time.is_none() {
            self.end_time = Some(at);
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed seconds between start and end; `None` while the session is open
    pub fn duration_seconds(&self) -> Option<f64> {
        self.end_time
            .map(|end| elapsed_seconds(self.start_time, end).max(0.0))
    }
}

/// All recorder state for one session.
///
/// Callers pass wall-clock timestamps; gap and duration measurements read
/// the session's monotonic clock instead.
#[derive(Debug, Clone)]
pub struct SessionContext {
    lifecycle: SessionLifecycle,
    clock: Arc<dyn MonotonicClock>,
    origin_ms: u64,
    taps: TapRecorder,
    swipes: SwipeRecorder,
    navigation: NavigationRecorder,
    flow: FlowRecorder,
}

impl SessionContext {
    /// Start a new session with fresh recorders, timed by the system clock
    pub fn start(config: &TelemetryConfig, at: DateTime<Utc>) -> Self {
        Self::start_with_clock(config, at, Arc::new(SystemClock::new()))
    }

    /// Start a new session timed by `clock`; offsets are measured from now
    pub fn start_with_clock(
        config: &TelemetryConfig,
        at: DateTime<Utc>,
        clock: Arc<dyn MonotonicClock>,
    ) -> Self {
        let lifecycle = SessionLifecycle::start(at);
        let origin_ms = clock.now_ms();
        info!(session_id = %lifecycle.session_id(), "session started");

        Self {
            lifecycle,
            clock,
            origin_ms,
            taps: TapRecorder::new(),
            swipes: SwipeRecorder::new(config.swipe_threshold_px),
            navigation: NavigationRecorder::new(),
            flow: FlowRecorder::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        self.lifecycle.session_id()
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// Monotonic milliseconds since the session started
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.origin_ms)
    }

    /// Record a tap, classifying its zone against the container it landed in.
    /// An unmeasured container yields `Zone::Unknown`; the tap is still kept.
    pub fn record_tap(
        &mut self,
        screen: &str,
        position: Position,
        container: Option<ContainerSize>,
        at: DateTime<Utc>,
    ) -> Zone {
        let zone = zone_for(position, container);
        let offset = self.elapsed_ms();
        self.taps.record_tap(screen, position, zone, at, offset);
        zone
    }

    pub fn swipe_start(&mut self, position: Position, at: DateTime<Utc>) {
        let offset = self.elapsed_ms();
        self.swipes.start(position, at, offset);
    }

    /// Finish a gesture; returns the swipe if the movement qualified as one
    pub fn swipe_end(&mut self, position: Position, at: DateTime<Utc>) -> Option<SwipeEvent> {
        let offset = self.elapsed_ms();
        self.swipes.end(position, at, offset).cloned()
    }

    pub fn log_visit(&mut self, screen: &str, at: DateTime<Utc>) {
        self.navigation.log_visit(screen, at);
    }

    pub fn record_screen_duration(&mut self, screen: &str, seconds: f64) {
        self.navigation.record_duration(screen, seconds);
    }

    pub fn flow_mut(&mut self) -> &mut FlowRecorder {
        &mut self.flow
    }

    pub fn taps(&self) -> &TapRecorder {
        &self.taps
    }

    pub fn swipes(&self) -> &SwipeRecorder {
        &self.swipes
    }

    pub fn navigation(&self) -> &NavigationRecorder {
        &self.navigation
    }

    pub fn flow(&self) -> &FlowRecorder {
        &self.flow
    }

    /// End the session and freeze its state into a snapshot
    pub fn end(mut self, at: DateTime<Utc>) -> SessionSnapshot {
        self.lifecycle.end(at);

        let (tap_events, tap_durations_ms) = self.taps.into_parts();
        let (screen_visits, screen_durations) = self.navigation.into_parts();
        let swipe_events = self.swipes.into_events();

        debug!(
            session_id = %self.lifecycle.session_id(),
            taps = tap_events.len(),
            swipes = swipe_events.len(),
            visits = screen_visits.len(),
            "session recorders frozen"
        );
        info!(
            session_id = %self.lifecycle.session_id(),
            duration_seconds = self.lifecycle.duration_seconds().unwrap_or(0.0),
            "session ended"
        );

        SessionSnapshot {
            session_id: self.lifecycle.session_id,
            start_time: Some(self.lifecycle.start_time),
            end_time: self.lifecycle.end_time,
            tap_events,
            tap_durations_ms,
            swipe_events,
            screen_visits,
            screen_durations,
            flow: self.flow.into_flags(),
        }
    }
}
