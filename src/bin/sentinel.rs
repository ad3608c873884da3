//! Sentinel CLI - Command-line interface for Session Sentinel
//!
//! Commands:
//! - assemble: Turn a session snapshot into a session document
//! - features: Extract feature vectors from session documents
//! - validate: Report structural issues in a session document
//! - doctor: Diagnose configuration and environment
//! - schema: Print document or feature schema information

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use session_sentinel::config::LogConfig;
use session_sentinel::features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
use session_sentinel::pipeline::{parse_document, parse_snapshot, SessionPipeline};
use session_sentinel::types::{GeoPoint, SessionDocument};
use session_sentinel::validation::{validate_document, DocumentIssue};
use session_sentinel::{logging, TelemetryConfig, TelemetryError, PRODUCER_NAME, SENTINEL_VERSION};

/// Sentinel - On-device behavioral telemetry for mobile banking sessions
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author = "Sentinel Mobile Security")]
#[command(version = SENTINEL_VERSION)]
#[command(about = "Assemble session documents and extract risk features", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set [default: the config file's
    /// log level, or warn without a config file]
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr (also enabled by the config file)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a session snapshot into a session document
    Assemble {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Document file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Telemetry config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Latitude of the session location
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude of the session location
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// JSON object file with device information
        #[arg(long)]
        device: Option<PathBuf>,

        /// Mark the session as screen-recorded
        #[arg(long)]
        recording_detected: bool,

        /// Pretty-print the document
        #[arg(long)]
        pretty: bool,
    },

    /// Extract feature vectors from session documents
    Features {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Emit named features alongside the session id
        #[arg(long)]
        named: bool,
    },

    /// Report structural issues in a session document
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Telemetry config file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one document per line)
    Ndjson,
    /// A single document or a JSON array of documents
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one vector per line)
    Ndjson,
    /// JSON array of vectors
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Feature vector layout
    Features,
    /// Persisted session document
    Document,
}

const DEFAULT_CLI_LOG_LEVEL: &str = "warn";

impl Cli {
    /// Logging settings from the flags, falling back to the command's config file
    fn log_config(&self) -> LogConfig {
        let from_file = match &self.command {
            Commands::Assemble {
                config: Some(path), ..
            }
            | Commands::Doctor {
                config: Some(path), ..
            } => TelemetryConfig::load(path).ok().map(|c| c.log),
            _ => None,
        };
        resolve_log_config(self.log_level.as_deref(), self.log_json, from_file)
    }
}

fn resolve_log_config(level: Option<&str>, json: bool, from_file: Option<LogConfig>) -> LogConfig {
    let mut log = from_file.unwrap_or_else(|| LogConfig {
        level: DEFAULT_CLI_LOG_LEVEL.to_string(),
        json: false,
    });
    if let Some(level) = level {
        log.level = level.to_string();
    }
    log.json |= json;
    log
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_from_config(&cli.log_config());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SentinelCliError> {
    match cli.command {
        Commands::Assemble {
            input,
            output,
            config,
            lat,
            lon,
            device,
            recording_detected,
            pretty,
        } => cmd_assemble(
            &input,
            &output,
            config.as_deref(),
            lat.zip(lon),
            device.as_deref(),
            recording_detected,
            pretty,
        ),

        Commands::Features {
            input,
            output,
            input_format,
            output_format,
            named,
        } => cmd_features(&input, &output, input_format, output_format, named),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_assemble(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    location: Option<(f64, f64)>,
    device: Option<&Path>,
    recording_detected: bool,
    pretty: bool,
) -> Result<(), SentinelCliError> {
    let config = load_config(config)?;
    let snapshot = parse_snapshot(&read_input(input)?)?;

    let mut pipeline = SessionPipeline::new(config);
    if let Some((latitude, longitude)) = location {
        pipeline = pipeline.with_location(Some(GeoPoint {
            latitude,
            longitude,
        }));
    }
    if let Some(device_path) = device {
        pipeline = pipeline.with_device_info(read_device_info(device_path)?);
    }

    let document = pipeline.finish(&snapshot, recording_detected);

    let output_data = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    write_output(output, &(output_data + "\n"))
}

fn cmd_features(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    named: bool,
) -> Result<(), SentinelCliError> {
    let input_data = read_input(input)?;

    let documents = match input_format {
        InputFormat::Ndjson => parse_ndjson_documents(&input_data)?,
        InputFormat::Json => parse_json_documents(&input_data)?,
    };

    if documents.is_empty() {
        return Err(SentinelCliError::NoDocuments);
    }

    let records: Vec<Value> = documents
        .iter()
        .map(|doc| feature_record(doc, &FeatureExtractor::extract(doc), named))
        .collect();

    let output_data = format_output(&records, &output_format)?;
    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), SentinelCliError> {
    let document = parse_document(&read_input(input)?)?;
    let issues = validate_document(&document);

    let report = ValidationReport {
        session_id: document.session.session_id.clone(),
        issue_count: issues.len(),
        issues: issues.iter().map(IssueDetail::from).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Session: {}", report.session_id);
        println!("Issues:  {}", report.issue_count);

        if !report.issues.is_empty() {
            println!("\nWarnings:");
            for issue in &report.issues {
                println!("  - {}", issue.message);
            }
        }
    }

    // Issues degrade features but never block the pipeline
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), SentinelCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "sentinel_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Sentinel version {}", SENTINEL_VERSION),
    });

    checks.push(DoctorCheck {
        name: "feature_layout".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} features per session", FEATURE_NAMES.len()),
    });

    if let Some(config_path) = config {
        let check = if config_path.exists() {
            match TelemetryConfig::load(config_path).and_then(|c| c.validate().map(|_| c)) {
                Ok(c) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (swipe threshold {}px, dedup {}ms, join {}s, poll {}s)",
                        c.swipe_threshold_px, c.dedup_window_ms, c.join_window_secs, c.recording_poll_secs
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        } else {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for piped documents)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: SENTINEL_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sentinel Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SentinelCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), SentinelCliError> {
    match schema_type {
        SchemaType::Features => {
            if json_schema {
                println!("{}", get_features_json_schema());
            } else {
                println!("Feature Vector ({} values, fixed order)", FEATURE_NAMES.len());
                println!();
                for (i, name) in FEATURE_NAMES.iter().enumerate() {
                    println!("  {:>2}. {}", i, name);
                }
                println!();
                println!("Missing inputs yield 0. Standard deviations use the n-1 divisor.");
            }
        }
        SchemaType::Document => {
            if json_schema {
                println!("{}", get_document_json_schema());
            } else {
                println!("Session Document");
                println!();
                println!("- session: {{ session_id, start_time, end_time, duration_seconds }}");
                println!("- device: device info object or {{ status: unavailable }}");
                println!("- location: {{ status: available, latitude, longitude }} or {{ status: unavailable }}");
                println!("- tap_durations_ms: gaps between consecutive taps");
                println!("- tap_events: filtered and deduplicated taps");
                println!("- raw_tap_events: taps as recorded");
                println!("- swipe_events: swipes with duration, distance and speed");
                println!("- screens_visited: visits with taps and swipes within the join window");
                println!("- screen_durations: seconds per screen");
                println!("- screen_recording_detected: bool");
                println!("- session_input: flow flags and login-relative offsets in seconds");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, SentinelCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), SentinelCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TelemetryConfig, SentinelCliError> {
    let config = match path {
        Some(path) => TelemetryConfig::load(path)?,
        None => TelemetryConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_device_info(path: &Path) -> Result<Map<String, Value>, SentinelCliError> {
    match serde_json::from_str::<Value>(&fs::read_to_string(path)?)? {
        Value::Object(map) => Ok(map),
        _ => Err(SentinelCliError::InvalidInput(format!(
            "Device info in {} must be a JSON object",
            path.display()
        ))),
    }
}

fn parse_ndjson_documents(data: &str) -> Result<Vec<SessionDocument>, SentinelCliError> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_document(line).map_err(SentinelCliError::from))
        .collect()
}

fn parse_json_documents(data: &str) -> Result<Vec<SessionDocument>, SentinelCliError> {
    match serde_json::from_str::<Value>(data)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(SentinelCliError::from))
            .collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

fn feature_record(document: &SessionDocument, features: &FeatureVector, named: bool) -> Value {
    if !named {
        return Value::from(features.to_vec());
    }
    let named_features: Map<String, Value> = features
        .named()
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::from(value)))
        .collect();
    serde_json::json!({
        "session_id": document.session.session_id,
        "features": named_features,
    })
}

fn format_output(records: &[Value], format: &OutputFormat) -> Result<String, SentinelCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)? + "\n"),
    }
}

fn get_features_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sentinel.features.v1",
        "description": "Fixed-order behavioral feature vector",
        "type": "array",
        "items": { "type": "number" },
        "minItems": FEATURE_NAMES.len(),
        "maxItems": FEATURE_NAMES.len(),
        "x-feature-names": FEATURE_NAMES,
    })
    .to_string()
}

fn get_document_json_schema() -> String {
    let timestamp = serde_json::json!({ "type": ["string", "integer", "null"] });
    let position = serde_json::json!({
        "type": "object",
        "properties": { "x": { "type": "number" }, "y": { "type": "number" } }
    });
    let tap = serde_json::json!({
        "type": "object",
        "properties": {
            "timestamp": timestamp,
            "monotonic_ms": { "type": ["integer", "null"], "minimum": 0 },
            "screen_name": { "type": "string" },
            "position": position,
            "zone": {
                "type": "string",
                "enum": [
                    "top_left", "top_center", "top_right",
                    "middle_left", "center", "middle_right",
                    "bottom_left", "bottom_center", "bottom_right", "unknown"
                ]
            }
        }
    });
    let swipe = serde_json::json!({
        "type": "object",
        "properties": {
            "start_position": position,
            "end_position": position,
            "start_time": timestamp,
            "end_time": timestamp,
            "duration_ms": { "type": "integer", "minimum": 0 },
            "distance_px": { "type": "number" },
            "speed_px_per_ms": { "type": "number" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sentinel.session_document.v1",
        "description": "Persisted behavioral telemetry for one session",
        "type": "object",
        "properties": {
            "session": {
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "start_time": timestamp,
                    "end_time": timestamp,
                    "duration_seconds": { "type": ["number", "null"] }
                }
            },
            "device": { "type": "object" },
            "location": {
                "type": "object",
                "required": ["status"],
                "properties": {
                    "status": { "enum": ["available", "unavailable"] },
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                }
            },
            "tap_durations_ms": { "type": "array", "items": { "type": "integer", "minimum": 0 } },
            "tap_events": { "type": "array", "items": tap },
            "raw_tap_events": { "type": "array", "items": tap },
            "swipe_events": { "type": "array", "items": swipe },
            "screens_visited": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "screen_name": { "type": "string" },
                        "timestamp": timestamp,
                        "taps": { "type": "array", "items": tap },
                        "swipes": { "type": "array", "items": swipe }
                    }
                }
            },
            "screen_durations": {
                "type": "object",
                "additionalProperties": { "type": "number" }
            },
            "screen_recording_detected": { "type": "boolean" },
            "session_input": { "type": "object" }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum SentinelCliError {
    Io(io::Error),
    Telemetry(TelemetryError),
    Json(serde_json::Error),
    InvalidInput(String),
    NoDocuments,
    DoctorFailed,
}

impl From<io::Error> for SentinelCliError {
    fn from(e: io::Error) -> Self {
        SentinelCliError::Io(e)
    }
}

impl From<TelemetryError> for SentinelCliError {
    fn from(e: TelemetryError) -> Self {
        SentinelCliError::Telemetry(e)
    }
}

impl From<serde_json::Error> for SentinelCliError {
    fn from(e: serde_json::Error) -> Self {
        SentinelCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SentinelCliError> for CliError {
    fn from(e: SentinelCliError) -> Self {
        match e {
            SentinelCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SentinelCliError::Telemetry(TelemetryError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'sentinel doctor --config <file>' for details".to_string()),
            },
            SentinelCliError::Telemetry(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a session snapshot or session document".to_string()),
            },
            SentinelCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SentinelCliError::InvalidInput(msg) => CliError {
                code: "INVALID_INPUT".to_string(),
                message: msg,
                hint: None,
            },
            SentinelCliError::NoDocuments => CliError {
                code: "NO_DOCUMENTS".to_string(),
                message: "No session documents found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SentinelCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    session_id: String,
    issue_count: usize,
    issues: Vec<IssueDetail>,
}

#[derive(serde::Serialize)]
struct IssueDetail {
    message: String,
    #[serde(flatten)]
    issue: DocumentIssue,
}

impl From<&DocumentIssue> for IssueDetail {
    fn from(issue: &DocumentIssue) -> Self {
        IssueDetail {
            message: issue.to_string(),
            issue: issue.clone(),
        }
    }
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
