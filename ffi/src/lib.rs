//! C-ABI wrapper around `fleetops-core`.
//!
//! # Overview
//! Exposes the resource registry, session and route cache through
//! `extern "C"` functions, so any language with a C FFI can build requests,
//! perform them itself, and decode the responses without linking to serde.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Resources are addressed by logical name (`"bins"`, `"trips"`); an
//!   unknown name makes the `fleet_build_*` functions return null.
//! - Payloads and decoded responses travel as JSON text in a single
//!   `FfiResult` envelope.
//! - The C caller owns all returned pointers and must call the matching
//!   `fleet_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use fleetops_core::session::TOKEN_KEY;
use fleetops_core::{
    build_login, complete_login, logout, response, ApiContext, ApiError, AudienceConfig, ClientConfig, Credentials,
    HostIo, HttpRequest, HttpResponse, MemorySessionStore, RequestOptions, ResourceClient, RouteTarget,
    SessionStore,
};
use serde_json::Value;

use types::*;

/// Borrow a C string as `&str`; null or invalid UTF-8 is `None`.
fn c_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Parse an optional JSON argument. Null is `Ok(None)`, bad JSON is `Err`.
fn json_arg(s: *const c_char) -> Result<Option<Value>, ()> {
    if s.is_null() {
        return Ok(None);
    }
    let text = c_str(s).ok_or(())?;
    serde_json::from_str(text).map(Some).map_err(|_| ())
}

/// Resolve `api` and `name` to a resource client, or `None` for null
/// arguments and unknown names.
fn resource<'a>(api: *const FfiApi, name: *const c_char) -> Option<&'a ResourceClient> {
    if api.is_null() {
        return None;
    }
    let api = unsafe { &*api };
    api.inner.resources.client(c_str(name)?).ok()
}

// ---------------------------------------------------------------------------
// Context lifecycle
// ---------------------------------------------------------------------------

/// Create a context whose desktop audience is bound to `base_url`.
///
/// `route_key` may be null to use the default obfuscation key.
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `fleet_api_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_api_new(base_url: *const c_char, route_key: *const c_char) -> *mut FfiApi {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(url) = c_str(base_url) else {
            return ptr::null_mut();
        };
        let mut config = ClientConfig {
            desktop: AudienceConfig::new(url).with_credentials(true),
            ..ClientConfig::default()
        };
        if let Some(key) = c_str(route_key) {
            config.route_key = key.to_string();
        }
        let inner = ApiContext::new(&config, Arc::new(MemorySessionStore::new()), Arc::new(HostIo));
        Box::into_raw(Box::new(FfiApi { inner }))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Free a context created by `fleet_api_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_api_free(api: *mut FfiApi) {
    if !api.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(api) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Store `token` as the bearer for subsequent requests.
///
/// Returns false if either argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_session_set_token(api: *const FfiApi, token: *const c_char) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if api.is_null() {
            return false;
        }
        let Some(token) = c_str(token) else {
            return false;
        };
        let api = unsafe { &*api };
        api.inner.session.set(TOKEN_KEY, token);
        true
    }))
    .unwrap_or(false)
}

/// Drop every session marker. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_session_clear(api: *const FfiApi) {
    if api.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let api = unsafe { &*api };
        logout(api.inner.session.as_ref());
    }));
}

/// Build the login request for `username` / `password`.
///
/// Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_login(
    api: *const FfiApi,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if api.is_null() {
            return ptr::null_mut();
        }
        let (Some(username), Some(password)) = (c_str(username), c_str(password)) else {
            return ptr::null_mut();
        };
        let api = unsafe { &*api };
        match build_login(&api.inner.desktop, &Credentials::new(username, password)) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => ptr::null_mut(),
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Decode a login response and begin the session.
///
/// On success `data` holds the identity (`token`, `role`, `unique_id`,
/// `name`) as JSON.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_parse_login(api: *const FfiApi, response: *const FfiHttpResponse) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if api.is_null() {
            return FfiResult::null_arg("api");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let api = unsafe { &*api };
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(e) => return FfiResult::from_error(e),
        };
        match complete_login(api.inner.session.as_ref(), resp) {
            Ok(identity) => FfiResult::ok_json(&serde_json::json!({
                "token": identity.token,
                "role": identity.role,
                "unique_id": identity.unique_id,
                "name": identity.name,
            })),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in fleet_parse_login"))
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

fn built(req: Result<HttpRequest, ApiError>) -> *mut FfiHttpRequest {
    match req {
        Ok(req) => FfiHttpRequest::from_core(req),
        Err(_) => ptr::null_mut(),
    }
}

/// Build a list request for the resource called `name`.
///
/// `page` and `page_size` are sent only when non-zero.
/// Returns null if `api` or `name` is null or `name` is not registered.
/// The caller must free the returned pointer with `fleet_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_list(
    api: *const FfiApi,
    name: *const c_char,
    page: u32,
    page_size: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(client) = resource(api, name) else {
            return ptr::null_mut();
        };
        let mut options = RequestOptions::new();
        if page > 0 {
            options = options.page(page);
        }
        if page_size > 0 {
            options = options.page_size(page_size);
        }
        FfiHttpRequest::from_core(client.build_list(&options))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Build a request fetching item `id` of resource `name`.
///
/// Returns null when `id` is not a single path segment (empty, `.`, `..`,
/// or containing `/`).
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_get(api: *const FfiApi, name: *const c_char, id: *const c_char) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(client), Some(id)) = (resource(api, name), c_str(id)) else {
            return ptr::null_mut();
        };
        built(client.build_get(id, &RequestOptions::default()))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Build a create request; `payload_json` must be valid JSON.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_create(
    api: *const FfiApi,
    name: *const c_char,
    payload_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(client) = resource(api, name) else {
            return ptr::null_mut();
        };
        let Ok(Some(payload)) = json_arg(payload_json) else {
            return ptr::null_mut();
        };
        built(client.build_create(&payload, &RequestOptions::default()))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Build an update request for item `id`; `payload_json` must be valid JSON.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_update(
    api: *const FfiApi,
    name: *const c_char,
    id: *const c_char,
    payload_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(client), Some(id)) = (resource(api, name), c_str(id)) else {
            return ptr::null_mut();
        };
        let Ok(Some(payload)) = json_arg(payload_json) else {
            return ptr::null_mut();
        };
        built(client.build_update(id, &payload, &RequestOptions::default()))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Build a request deleting item `id` of resource `name`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_remove(
    api: *const FfiApi,
    name: *const c_char,
    id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(client), Some(id)) = (resource(api, name), c_str(id)) else {
            return ptr::null_mut();
        };
        built(client.build_remove(id, &RequestOptions::default()))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Build a custom action request.
///
/// A `payload_json` holding a JSON value makes it a POST carrying that
/// body; a null pointer or the JSON literal `null` makes it a GET.
/// Malformed JSON returns null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_build_action(
    api: *const FfiApi,
    name: *const c_char,
    action: *const c_char,
    payload_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(client), Some(action)) = (resource(api, name), c_str(action)) else {
            return ptr::null_mut();
        };
        let Ok(payload) = json_arg(payload_json) else {
            return ptr::null_mut();
        };
        let payload = payload.filter(|v| !v.is_null());
        built(client.build_action(action, payload.as_ref(), &RequestOptions::default()))
    }))
    .unwrap_or(ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
///
/// A null body reads as empty; a body that is not UTF-8 is a decoding error.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> Result<HttpResponse, ApiError> {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_str()
            .map_err(|e| ApiError::DeserializationError(format!("response body is not UTF-8: {e}")))?
            .to_string()
    };
    Ok(HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body,
    })
}

/// Parse a single-item response (get, create, update, action).
///
/// `data` holds the item as JSON, or `null` for an empty body.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_parse_item(response: *const FfiHttpResponse) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(e) => return FfiResult::from_error(e),
        };
        match response::decode_item::<Value>(resp) {
            Ok(item) => FfiResult::ok_json(&item),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in fleet_parse_item"))
}

/// Parse a list response in any accepted shape.
///
/// `data` is always a page object: `{"count", "next", "previous",
/// "results": [...]}`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_parse_list(response: *const FfiHttpResponse) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(e) => return FfiResult::from_error(e),
        };
        let page = response::decode_page::<Value>(resp).and_then(|page| {
            serde_json::to_value(page).map_err(|e| ApiError::SerializationError(e.to_string()))
        });
        match page {
            Ok(page) => FfiResult::ok_json(&page),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in fleet_parse_list"))
}

/// Parse a remove response; success carries no data.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_parse_remove(response: *const FfiHttpResponse) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(e) => return FfiResult::from_error(e),
        };
        match response::decode_empty(resp) {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in fleet_parse_remove"))
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Obfuscated URL segment for route `key`, or null if the key is unknown.
/// Free the result with `fleet_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_route_token(api: *const FfiApi, key: *const c_char) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if api.is_null() {
            return ptr::null_mut();
        }
        let Some(key) = c_str(key) else {
            return ptr::null_mut();
        };
        let api = unsafe { &*api };
        match api.inner.routes.encrypted_table().token(key) {
            Some(token) => types::into_c_string(token),
            None => ptr::null_mut(),
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Route key for an obfuscated URL segment, or null when it leads nowhere.
/// Free the result with `fleet_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_route_resolve(api: *const FfiApi, token: *const c_char) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if api.is_null() {
            return ptr::null_mut();
        }
        let Some(token) = c_str(token) else {
            return ptr::null_mut();
        };
        let api = unsafe { &*api };
        match api.inner.routes.resolve(token) {
            RouteTarget::Screen(key) => types::into_c_string(key),
            RouteTarget::NotFound => ptr::null_mut(),
        }
    }))
    .unwrap_or(ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `fleet_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        for s in [req.url, req.body] {
            if !s.is_null() {
                drop(unsafe { CString::from_raw(s) });
            }
        }
        for (data, len) in [(req.headers, req.headers_len), (req.query, req.query_len)] {
            for pair in unsafe { from_raw_slice(data, len) } {
                unsafe { pair.free_fields() };
            }
        }
    }));
}

/// Free an `FfiResult` returned by any `fleet_parse_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        for s in [result.error_message, result.data] {
            if !s.is_null() {
                drop(unsafe { CString::from_raw(s) });
            }
        }
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fleet_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
