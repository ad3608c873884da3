//! FFI bindings for Session Sentinel
//!
//! This module provides C-compatible functions for driving a telemetry session
//! from the host app. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `sentinel_free_string`.
//! Timestamps cross the boundary as Unix epoch milliseconds.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::TelemetryConfig;
use crate::pipeline::{document_to_features, SessionPipeline};
use crate::session::SessionContext;
use crate::types::{ContainerSize, Position};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn timestamp_from_millis(epoch_ms: i64) -> Option<DateTime<Utc>> {
    let at = DateTime::from_timestamp_millis(epoch_ms);
    if at.is_none() {
        set_last_error(&format!("Timestamp out of range: {}", epoch_ms));
    }
    at
}

// ============================================================================
// Stateless API
// ============================================================================

/// Extract the feature vector from a session document, as a JSON array.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sentinel_free_string`.
/// - Returns NULL on error; call `sentinel_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sentinel_document_to_features(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let features = match document_to_features(&json_str) {
        Ok(features) => features,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&features) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Session API
// ============================================================================

/// Opaque handle to an active session
pub struct SentinelSessionHandle {
    context: SessionContext,
    pipeline: SessionPipeline,
}

/// Start a session at `epoch_ms` with default settings.
///
/// `epoch_ms` arguments are wall-clock stamps; tap gaps and swipe durations
/// are measured on the process monotonic clock.
///
/// # Safety
/// - Returns a pointer to a newly allocated session.
/// - Must be released with `sentinel_session_finish` or `sentinel_session_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_start(epoch_ms: i64) -> *mut SentinelSessionHandle {
    clear_last_error();

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return ptr::null_mut(),
    };

    let config = TelemetryConfig::default();
    let handle = Box::new(SentinelSessionHandle {
        context: SessionContext::start(&config, at),
        pipeline: SessionPipeline::new(config),
    });
    Box::into_raw(handle)
}

/// Free a session without producing a document.
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_free(session: *mut SentinelSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Record a tap. A non-positive `width` or `height` means the container was
/// not measured and the tap is classified as `unknown`.
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - `screen` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_record_tap(
    session: *mut SentinelSessionHandle,
    screen: *const c_char,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    epoch_ms: i64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let screen_str = match cstr_to_string(screen) {
        Some(s) => s,
        None => {
            set_last_error("Invalid screen string pointer");
            return -1;
        }
    };

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return -1,
    };

    handle.context.record_tap(
        &screen_str,
        Position::new(x, y),
        ContainerSize::new(width, height),
        at,
    );
    0
}

/// Begin a gesture at (`x`, `y`).
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_swipe_start(
    session: *mut SentinelSessionHandle,
    x: f64,
    y: f64,
    epoch_ms: i64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return -1,
    };

    handle.context.swipe_start(Position::new(x, y), at);
    0
}

/// Finish a gesture at (`x`, `y`).
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - Returns 1 if a swipe was recorded, 0 if the gesture did not qualify,
///   -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_swipe_end(
    session: *mut SentinelSessionHandle,
    x: f64,
    y: f64,
    epoch_ms: i64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return -1,
    };

    match handle.context.swipe_end(Position::new(x, y), at) {
        Some(_) => 1,
        None => 0,
    }
}

/// Log a screen visit.
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - `screen` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_log_visit(
    session: *mut SentinelSessionHandle,
    screen: *const c_char,
    epoch_ms: i64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let screen_str = match cstr_to_string(screen) {
        Some(s) => s,
        None => {
            set_last_error("Invalid screen string pointer");
            return -1;
        }
    };

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return -1,
    };

    handle.context.log_visit(&screen_str, at);
    0
}

/// Record the time spent on a screen, in seconds.
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - `screen` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_record_duration(
    session: *mut SentinelSessionHandle,
    screen: *const c_char,
    seconds: f64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let screen_str = match cstr_to_string(screen) {
        Some(s) => s,
        None => {
            set_last_error("Invalid screen string pointer");
            return -1;
        }
    };

    handle.context.record_screen_duration(&screen_str, seconds);
    0
}

/// Mark a banking-flow event. `kind` is one of `login`, `fd_broken`,
/// `loan_taken`, `transaction_start`, `transaction_end` or
/// `transaction_amount` (which reads `amount` and ignores `epoch_ms`).
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - `kind` must be a valid null-terminated C string; `amount` may be NULL
///   unless `kind` is `transaction_amount`.
/// - Returns 1 if the flag was set, 0 if it was already set, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_mark_flow(
    session: *mut SentinelSessionHandle,
    kind: *const c_char,
    epoch_ms: i64,
    amount: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let kind_str = match cstr_to_string(kind) {
        Some(s) => s,
        None => {
            set_last_error("Invalid kind string pointer");
            return -1;
        }
    };

    if kind_str == "transaction_amount" {
        return match cstr_to_string(amount) {
            Some(value) => handle.context.flow_mut().set_transaction_amount(&value) as i32,
            None => {
                set_last_error("Invalid amount string pointer");
                -1
            }
        };
    }

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return -1,
    };

    let flow = handle.context.flow_mut();
    let changed = match kind_str.as_str() {
        "login" => flow.mark_login(at),
        "fd_broken" => flow.mark_fd_broken(at),
        "loan_taken" => flow.mark_loan_taken(at),
        "transaction_start" => flow.mark_transaction_start(at),
        "transaction_end" => flow.mark_transaction_end(at),
        other => {
            set_last_error(&format!("Unknown flow kind: {}", other));
            return -1;
        }
    };
    changed as i32
}

/// End the session and return its document JSON. The handle is consumed
/// whether or not this succeeds.
///
/// # Safety
/// - `session` must be a valid pointer returned by `sentinel_session_start`.
/// - After calling this function, the pointer is invalid.
/// - Returns a newly allocated string that must be freed with `sentinel_free_string`.
/// - Returns NULL on error; call `sentinel_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sentinel_session_finish(
    session: *mut SentinelSessionHandle,
    epoch_ms: i64,
    recording_detected: bool,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = Box::from_raw(session);

    let at = match timestamp_from_millis(epoch_ms) {
        Some(at) => at,
        None => return ptr::null_mut(),
    };

    let SentinelSessionHandle { context, pipeline } = *handle;
    let snapshot = context.end(at);
    let document = pipeline.finish(&snapshot, recording_detected);

    match serde_json::to_string(&document) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Sentinel functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Sentinel function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sentinel_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Sentinel function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sentinel_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Sentinel library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sentinel_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
