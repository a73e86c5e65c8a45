//! FFI bindings for SwarSetu Flux
//!
//! C-compatible entry points for calling the normalizer from other runtimes.
//! Strings returned by these functions are allocated here and must be released
//! with `swarsetu_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde_json::Value;

use crate::error::ComputeError;
use crate::explainer::fallback_explanation;
use crate::session::build_session;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

/// Return the JSON text of `result`, or record the error and return NULL
fn respond(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a raw assessment payload into the canonical session JSON.
///
/// # Safety
/// - `payload_json` must be a valid null-terminated C string.
/// - `disorder_type` may be NULL (falls back to the payload's `disorder_type`).
/// - Returns a newly allocated string that must be freed with `swarsetu_free_string`.
/// - Returns NULL if the payload is not valid JSON; call `swarsetu_last_error`.
#[no_mangle]
pub unsafe extern "C" fn swarsetu_build_session(
    payload_json: *const c_char,
    disorder_type: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(payload_json) else {
        set_last_error("Invalid payload string pointer");
        return ptr::null_mut();
    };
    let disorder = cstr_to_string(disorder_type);

    respond(
        serde_json::from_str::<Value>(&json_str)
            .map_err(ComputeError::from)
            .and_then(|payload| {
                let session = build_session(&payload, disorder.as_deref());
                Ok(serde_json::to_string(&session)?)
            }),
    )
}

/// Produce the local fallback explanation for a prediction.
///
/// # Safety
/// - `disorder_type` and `prediction_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `swarsetu_free_string`.
/// - Returns NULL if the prediction is not valid JSON; call `swarsetu_last_error`.
#[no_mangle]
pub unsafe extern "C" fn swarsetu_fallback_explanation(
    disorder_type: *const c_char,
    prediction_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(disorder) = cstr_to_string(disorder_type) else {
        set_last_error("Invalid disorder_type string pointer");
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_to_string(prediction_json) else {
        set_last_error("Invalid prediction string pointer");
        return ptr::null_mut();
    };

    respond(
        serde_json::from_str::<Value>(&json_str)
            .map_err(ComputeError::from)
            .and_then(|prediction| {
                let explanation = fallback_explanation(disorder.trim(), &prediction);
                Ok(serde_json::to_string(&explanation)?)
            }),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a pointer returned by a `swarsetu_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn swarsetu_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `swarsetu_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn swarsetu_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn swarsetu_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
