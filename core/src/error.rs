//! Error types for the resource-access layer.
//!
//! # Design
//! One enum covers registry construction, transport and decoding failures.
//! `RequestFailed` is the only variant produced by I/O: it carries the HTTP
//! status when the server answered, and `None` when no response arrived.
//! A route token that does not decode is not an error at all; the route
//! cache reports it as `None` / `RouteTarget::NotFound`.

use thiserror::Error;

/// Result alias used across the crate.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A logical name was looked up that no descriptor registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Two descriptors (or two route keys) claimed the same name.
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// A descriptor's path normalizes to the bare root.
    #[error("invalid resource path for {0}")]
    InvalidResourcePath(String),

    /// An id or action name that is not a single path component.
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// A route key is not part of the route table.
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// Non-2xx response, or no response at all (`status` is `None`).
    #[error("request failed{}: {body}", describe_status(.status))]
    RequestFailed { status: Option<u16>, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::RequestFailed {
            status: None,
            body: msg.into(),
        }
    }

    /// HTTP status of a failed request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => " (no response)".to_string(),
    }
}
