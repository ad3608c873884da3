//! Session Sentinel - On-device behavioral telemetry for mobile banking sessions
//!
//! Sentinel captures how a user interacts with the app during one session and
//! turns it into a fixed-length feature vector for fraud and risk scoring:
//! interaction capture → session snapshot → enrichment → document assembly
//! → feature extraction.
//!
//! ## Modules
//!
//! - **Capture**: per-session recorders for taps, swipes, navigation and banking flow
//! - **Processing**: enrichment (filter, dedup, time-join), assembly and feature extraction
//! - **Collaborators**: seams for location, device info, screen recording, storage and scoring

pub mod assembler;
pub mod collaborators;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod features;
pub mod logging;
pub mod monitor;
pub mod pipeline;
pub mod recorder;
pub mod session;
pub mod types;
pub mod validation;
pub mod zone;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use features::{FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use monitor::RecordingMonitor;
pub use pipeline::{document_to_features, snapshot_to_document, SessionPipeline};
pub use session::SessionContext;
pub use types::{SessionDocument, SessionSnapshot};
pub use validation::{validate_document, DocumentIssue};

/// Sentinel version
pub const SENTINEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "session-sentinel";
