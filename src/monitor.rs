//! Screen-recording monitor
//!
//! A cancellable background task polls a [`RecordingDetector`] on a fixed
//! period. The first positive poll latches the session's detection flag,
//! publishes a [`RecordingNotice`] for the host UI, and ends the task. The
//! flag is read only through [`RecordingMonitor::stop`], which cancels and
//! joins the task first so detection cannot race document assembly.

use crate::collaborators::RecordingDetector;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Emitted once when recording is first detected in a session
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingNotice {
    pub detected_at: DateTime<Utc>,
}

pub struct RecordingMonitor {
    detected: Arc<AtomicBool>,
    notices: watch::Receiver<Option<RecordingNotice>>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl RecordingMonitor {
    /// Start polling `detector` every `period`. Must be called inside a tokio runtime.
    pub fn spawn(detector: Arc<dyn RecordingDetector>, period: Duration) -> Self {
        let detected = Arc::new(AtomicBool::new(false));
        let (sender, notices) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(poll_detector(
            detector,
            period.max(Duration::from_millis(1)),
            detected.clone(),
            sender,
            shutdown.clone(),
        ));

        Self {
            detected,
            notices,
            shutdown,
            handle,
        }
    }

    /// Subscribe to the detection notice; the value stays `None` until detection
    pub fn subscribe(&self) -> watch::Receiver<Option<RecordingNotice>> {
        self.notices.clone()
    }

    /// Non-synchronising peek at the latch, for display purposes only
    pub fn is_detected(&self) -> bool {
        self.detected.load(Ordering::Acquire)
    }

    /// Cancel the poll task, wait for it to finish, then read the latch
    pub async fn stop(self) -> bool {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "recording monitor task failed");
        }
        self.detected.load(Ordering::Acquire)
    }
}

async fn poll_detector(
    detector: Arc<dyn RecordingDetector>,
    period: Duration,
    detected: Arc<AtomicBool>,
    notices: watch::Sender<Option<RecordingNotice>>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(period_ms = period.as_millis() as u64, "recording monitor started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("recording monitor cancelled");
                break;
            }
            _ = ticker.tick() => {
                if detector.is_recording() {
                    detected.store(true, Ordering::Release);
                    warn!("screen recording detected");
                    // No receivers is fine; the latch is the source of truth
                    let _ = notices.send(Some(RecordingNotice { detected_at: Utc::now() }));
                    break;
                }
            }
        }
    }

    info!(detected = detected.load(Ordering::Acquire), "recording monitor stopped");
}
