//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, boxed slices with an explicit length
//! instead of `Vec`, and enums with explicit discriminants. Payloads cross
//! the boundary as JSON text, so one result type serves every resource.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use fleetops_core::{ApiContext, ApiError, HttpMethod, HttpRequest};

/// Opaque handle to an `ApiContext`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiApi {
    pub(crate) inner: ApiContext,
}

/// Copy `s` into a heap C string owned by the caller.
///
/// Interior NUL bytes cannot be represented and are dropped.
pub(crate) fn into_c_string(s: impl Into<String>) -> *mut c_char {
    let mut s = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

/// Hand a vector to C as pointer + length. Empty vectors become null.
fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    (Box::into_raw(items.into_boxed_slice()) as *mut T, len)
}

/// Take back a slice produced by `into_raw_slice`.
///
/// # Safety
/// `data` and `len` must come from one `into_raw_slice` call and not have
/// been freed.
pub(crate) unsafe fn from_raw_slice<T>(data: *mut T, len: u32) -> Vec<T> {
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = ptr::slice_from_raw_parts_mut(data, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A key-value pair of C strings, used for headers and query parameters.
#[repr(C)]
pub struct FfiPair {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

impl FfiPair {
    fn from_core(pairs: Vec<(String, String)>) -> (*mut FfiPair, u32) {
        into_raw_slice(
            pairs
                .into_iter()
                .map(|(k, v)| FfiPair {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect(),
        )
    }

    /// # Safety
    /// Both strings must have been produced by `into_c_string`.
    pub(crate) unsafe fn free_fields(&self) {
        for s in [self.key, self.value] {
            if !s.is_null() {
                drop(unsafe { CString::from_raw(s) });
            }
        }
    }
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `fleet_build_*` functions. The C caller appends the query
/// parameters to `url`, executes the request, and passes the response back
/// through `fleet_parse_*`. When `with_credentials` is set the host sends
/// its cookies along.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiPair,
    pub headers_len: u32,
    pub query: *mut FfiPair,
    pub query_len: u32,
    pub body: *mut c_char,
    pub with_credentials: bool,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let (headers, headers_len) = FfiPair::from_core(req.headers);
        let (query, query_len) = FfiPair::from_core(req.query);
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => ptr::null_mut(),
        };
        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: into_c_string(req.url),
            headers,
            headers_len,
            query,
            query_len,
            body,
            with_credentials: req.with_credentials,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request and
/// passes a pointer to a `fleet_parse_*` function. The FFI layer reads but
/// does not free these fields. A null `body` reads as empty.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Http = 2,
    Network = 3,
    Deserialization = 4,
    Serialization = 5,
    InvalidArgument = 6,
    Panic = 7,
    NullArg = 8,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// holds the decoded payload as JSON text (null when there is none).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `http_status` is the server's status if it
/// answered, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data: *mut c_char,
}

impl FfiResult {
    fn boxed(error_code: FfiErrorCode, error_message: *mut c_char, http_status: u16, data: *mut c_char) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message,
            http_status,
            data,
        }))
    }

    /// Success carrying `value` serialized as JSON.
    pub(crate) fn ok_json(value: &serde_json::Value) -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, ptr::null_mut(), 0, into_c_string(value.to_string()))
    }

    /// Success with no data payload (e.g. remove).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, ptr::null_mut(), 0, ptr::null_mut())
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match &err {
            ApiError::RequestFailed { status: Some(404), .. } => FfiErrorCode::NotFound,
            ApiError::RequestFailed { status: Some(_), .. } => FfiErrorCode::Http,
            ApiError::RequestFailed { status: None, .. } => FfiErrorCode::Network,
            ApiError::DeserializationError(_) => FfiErrorCode::Deserialization,
            ApiError::SerializationError(_) => FfiErrorCode::Serialization,
            ApiError::UnknownEntity(_)
            | ApiError::DuplicateRegistration(_)
            | ApiError::InvalidResourcePath(_)
            | ApiError::InvalidSegment(_)
            | ApiError::UnknownRoute(_)
            | ApiError::Config(_) => FfiErrorCode::InvalidArgument,
        };
        let status = err.status().unwrap_or(0);
        Self::boxed(code, into_c_string(err.to_string()), status, ptr::null_mut())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            into_c_string(format!("null argument: {name}")),
            0,
            ptr::null_mut(),
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, into_c_string(msg), 0, ptr::null_mut())
    }
}
