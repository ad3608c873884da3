//! Error types for Session Sentinel

use thiserror::Error;

/// Errors surfaced at the edges of the pipeline (parsing, configuration, export).
///
/// Enrichment and feature extraction never fail; they degrade to sentinel
/// values instead.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to parse session data: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Scoring model error: {0}")]
    ScoringError(String),
}
