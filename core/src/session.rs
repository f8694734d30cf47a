//! Session marker storage and the login/logout flow.
//!
//! # Design
//! The store is an external collaborator: the transport only reads the
//! bearer token from it, while `login`/`logout` are the only writers.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{RequestOptions, TransportClient};
use crate::types::{Credentials, LoginResponse};

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";
pub const UNIQUE_ID_KEY: &str = "unique_id";
pub const NAME_KEY: &str = "name";

const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, ROLE_KEY, UNIQUE_ID_KEY, NAME_KEY];

/// Client-side key/value storage for the session marker.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// `SessionStore` kept in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// Identity fields written at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub token: String,
    pub role: Option<String>,
    pub unique_id: Option<String>,
    pub name: Option<String>,
}

impl From<LoginResponse> for SessionIdentity {
    fn from(resp: LoginResponse) -> Self {
        Self {
            token: resp.token,
            role: resp.role,
            unique_id: resp.unique_id,
            name: resp.name,
        }
    }
}

pub struct Session;

impl Session {
    /// Write every identity field; absent optional fields are cleared.
    pub fn begin(store: &dyn SessionStore, identity: &SessionIdentity) {
        store.set(TOKEN_KEY, &identity.token);
        for (key, value) in [
            (ROLE_KEY, &identity.role),
            (UNIQUE_ID_KEY, &identity.unique_id),
            (NAME_KEY, &identity.name),
        ] {
            match value {
                Some(v) => store.set(key, v),
                None => store.remove(key),
            }
        }
        tracing::info!(role = identity.role.as_deref().unwrap_or("-"), "session started");
    }

    pub fn end(store: &dyn SessionStore) {
        for key in SESSION_KEYS {
            store.remove(key);
        }
        tracing::info!("session ended");
    }

    /// The stored identity, if a token is present.
    pub fn current(store: &dyn SessionStore) -> Option<SessionIdentity> {
        Some(SessionIdentity {
            token: store.get(TOKEN_KEY)?,
            role: store.get(ROLE_KEY),
            unique_id: store.get(UNIQUE_ID_KEY),
            name: store.get(NAME_KEY),
        })
    }
}

/// The login request for `credentials`, without performing it.
pub fn build_login(transport: &TransportClient, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(credentials).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    Ok(transport.prepare(
        HttpMethod::Post,
        transport.login_path(),
        Some(body),
        &RequestOptions::default(),
    ))
}

/// Decode a login response and begin the session it describes.
pub fn complete_login(store: &dyn SessionStore, response: HttpResponse) -> Result<SessionIdentity, ApiError> {
    let response = response.error_for_status()?;
    let decoded: LoginResponse =
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    let identity = SessionIdentity::from(decoded);
    Session::begin(store, &identity);
    Ok(identity)
}

/// Exchange credentials for a session and store it.
///
/// The request goes to the transport's login path, which is never
/// authenticated, so a stale token in the store does not leak into it.
pub fn login(transport: &TransportClient, credentials: &Credentials) -> Result<SessionIdentity, ApiError> {
    let response = transport.execute(build_login(transport, credentials)?)?;
    complete_login(transport.session_store(), response)
}

pub fn logout(store: &dyn SessionStore) {
    Session::end(store);
}
