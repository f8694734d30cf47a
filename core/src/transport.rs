//! Transport client: base URL binding, JSON headers and bearer injection.
//!
//! # Design
//! `BearerAuth` is the single place that decides whether a request carries
//! `Authorization: Bearer <token>`. The desktop and mobile transports hold
//! the same `Arc<BearerAuth>`, so the rule is written once and attached to
//! both. Unauthenticated endpoints (always including the login path) are
//! matched by exact normalized path; a path that merely contains the login
//! path as a substring is still authenticated.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::AudienceConfig;
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse};
use crate::path;
use crate::session::{SessionStore, TOKEN_KEY};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Per-call extras: query parameters and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page)
    }

    pub fn page_size(self, size: u32) -> Self {
        self.param("page_size", size)
    }

    pub fn search(self, term: impl Into<String>) -> Self {
        self.param("search", term.into())
    }

    pub fn ordering(self, field: impl Into<String>) -> Self {
        self.param("ordering", field.into())
    }
}

/// Attaches the session's bearer token to outgoing requests.
pub struct BearerAuth {
    store: Arc<dyn SessionStore>,
    login_path: String,
    unauthenticated: BTreeSet<String>,
}

impl BearerAuth {
    /// `login_path` never carries a bearer.
    pub fn new(store: Arc<dyn SessionStore>, login_path: &str) -> Self {
        let login_path = path::normalize(login_path);
        Self {
            store,
            unauthenticated: BTreeSet::from([login_path.clone()]),
            login_path,
        }
    }

    /// Exempt further paths from the bearer.
    pub fn with_unauthenticated<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.unauthenticated
            .extend(paths.into_iter().map(|p| path::normalize(p.as_ref())));
        self
    }

    /// Normalized login path.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// False only for paths registered as unauthenticated.
    pub fn requires_token(&self, request_path: &str) -> bool {
        !self.unauthenticated.contains(&path::normalize(request_path))
    }

    /// Push the bearer header if the path needs it and a token is stored.
    /// Returns whether a header was added.
    pub fn apply(&self, request_path: &str, headers: &mut Vec<(String, String)>) -> bool {
        if !self.requires_token(request_path) {
            return false;
        }
        match self.store.get(TOKEN_KEY) {
            Some(token) if !token.is_empty() => {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
                true
            }
            _ => false,
        }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("unauthenticated", &self.unauthenticated)
            .finish_non_exhaustive()
    }
}

/// HTTP client bound to one base URL.
///
/// Construct one per audience at start-up and share it behind an `Arc`.
pub struct TransportClient {
    base_url: String,
    with_credentials: bool,
    auth: Arc<BearerAuth>,
    executor: Arc<dyn HttpExecutor>,
}

impl TransportClient {
    pub fn new(audience: &AudienceConfig, auth: Arc<BearerAuth>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            base_url: audience.base_url.trim_end_matches('/').to_string(),
            with_credentials: audience.with_credentials,
            auth,
            executor,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_path(&self) -> &str {
        self.auth.login_path()
    }

    pub fn session_store(&self) -> &dyn SessionStore {
        self.auth.store()
    }

    /// Build the request for `path` (relative to the base URL) without
    /// performing it. Headers in `options` replace injected headers of the
    /// same name.
    pub fn prepare(
        &self,
        method: HttpMethod,
        request_path: &str,
        body: Option<String>,
        options: &RequestOptions,
    ) -> HttpRequest {
        let normalized = path::normalize(request_path);
        let mut headers = vec![
            ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
            ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];
        self.auth.apply(&normalized, &mut headers);
        for (key, value) in &options.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
            headers.push((key.clone(), value.clone()));
        }

        HttpRequest {
            method,
            url: format!("{}{normalized}", self.base_url),
            query: options.query.clone(),
            headers,
            body,
            with_credentials: self.with_credentials,
        }
    }

    /// Run a prepared request; non-2xx responses become `RequestFailed`.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(
            %method,
            %url,
            authenticated = request.header("Authorization").is_some(),
            "dispatching request"
        );

        let response = self.executor.execute(request).map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "request did not complete");
            e
        })?;
        tracing::debug!(%method, %url, status = response.status, "response received");

        response.error_for_status().map_err(|e| {
            tracing::warn!(%method, %url, status = ?e.status(), "request rejected");
            e
        })
    }

    pub fn request(
        &self,
        method: HttpMethod,
        request_path: &str,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<HttpResponse, ApiError> {
        self.execute(self.prepare(method, request_path, body, options))
    }
}

impl fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportClient")
            .field("base_url", &self.base_url)
            .field("with_credentials", &self.with_credentials)
            .field("login_path", &self.login_path())
            .finish_non_exhaustive()
    }
}
