//! Client configuration.
//!
//! Two audiences share the credential semantics but talk to different base
//! URLs: the desktop admin API sends ambient credentials, the mobile API
//! does not.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ENV_API_URL: &str = "FLEETOPS_API_URL";
pub const ENV_MOBILE_API_URL: &str = "FLEETOPS_MOBILE_API_URL";
pub const ENV_ROUTE_KEY: &str = "FLEETOPS_ROUTE_KEY";
pub const ENV_TIMEOUT_SECS: &str = "FLEETOPS_TIMEOUT_SECS";

/// Settings for one `TransportClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceConfig {
    pub base_url: String,
    #[serde(default)]
    pub with_credentials: bool,
}

impl AudienceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            with_credentials: false,
        }
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Desktop admin API (default: "http://localhost:8000/api", with credentials)
    #[serde(default = "default_desktop")]
    pub desktop: AudienceConfig,

    /// Mobile API (default: "http://localhost:8000/mobile-api")
    #[serde(default = "default_mobile")]
    pub mobile: AudienceConfig,

    /// Path of the login endpoint (default: "auth/login")
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Paths sent without a bearer token, matched exactly after
    /// normalization. The login path is always included.
    #[serde(default)]
    pub unauthenticated_paths: Vec<String>,

    /// Key material for route segment obfuscation.
    #[serde(default = "default_route_key")]
    pub route_key: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_desktop() -> AudienceConfig {
    AudienceConfig::new("http://localhost:8000/api").with_credentials(true)
}

fn default_mobile() -> AudienceConfig {
    AudienceConfig::new("http://localhost:8000/mobile-api")
}

fn default_login_path() -> String {
    "auth/login".to_string()
}

fn default_route_key() -> String {
    "fleetops-route-segments".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            desktop: default_desktop(),
            mobile: default_mobile(),
            login_path: default_login_path(),
            unauthenticated_paths: Vec::new(),
            route_key: default_route_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `FLEETOPS_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL) {
            config.desktop.base_url = url;
        }
        if let Some(url) = lookup(ENV_MOBILE_API_URL) {
            config.mobile.base_url = url;
        }
        if let Some(key) = lookup(ENV_ROUTE_KEY) {
            config.route_key = key;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("{ENV_TIMEOUT_SECS} must be an integer, got {raw:?}")))?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
