//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and decodes `HttpResponse` values; the actual round-trip happens
//! behind the `HttpExecutor` trait, so the same request-building code serves
//! the bundled `ureq` executor, test doubles, and C hosts that perform I/O
//! themselves.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

use std::fmt;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `query` pairs are stored unencoded; the executor is responsible for
/// percent-encoding them onto `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Whether the host should send ambient credentials (cookies) along.
    pub with_credentials: bool,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `RequestFailed`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ApiError::RequestFailed {
            status: Some(self.status),
            body: self.body,
        })
    }
}

/// Performs the network round-trip for a prepared request.
///
/// Implementations return any HTTP response as `Ok`, whatever its status;
/// only a failure to obtain a response is an `Err`.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Executor for embedders that run requests themselves.
///
/// Clients wired to `HostIo` are used only through their `build_*` methods;
/// calling an executing operation fails without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostIo;

impl HttpExecutor for HostIo {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        Err(ApiError::network(format!(
            "{} {} must be executed by the host",
            request.method, request.url
        )))
    }
}
