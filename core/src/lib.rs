//! Resource-access core for the fleet operations admin API.
//!
//! # Overview
//! A declarative endpoint table is turned into one uniform CRUD client per
//! resource, all sharing a transport that binds the base URL and injects the
//! session's bearer token. Next to it, a route cache maps screen names to
//! opaque URL tokens and back.
//!
//! # Design
//! - Request building and response decoding are pure; I/O happens behind
//!   `HttpExecutor` (host-does-IO), so the same code serves the bundled
//!   `ureq` executor, tests, and C hosts through the `ffi` crate.
//! - Everything is built once at start-up (`ApiContext`) and shared by
//!   reference; all types are `Send + Sync`.
//! - No retries, caching or cancellation: failures propagate to the caller.

pub mod client;
pub mod config;
pub mod context;
pub mod endpoints;
pub mod error;
#[cfg(feature = "ureq")]
pub mod executor;
pub mod http;
pub mod path;
pub mod registry;
pub mod response;
pub mod routes;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ResourceClient;
pub use config::{AudienceConfig, ClientConfig};
pub use context::ApiContext;
pub use endpoints::{EndpointDescriptor, EndpointRegistry, Entity};
pub use error::{ApiError, ApiResult};
#[cfg(feature = "ureq")]
pub use executor::UreqExecutor;
pub use http::{HostIo, HttpExecutor, HttpMethod, HttpRequest, HttpResponse};
pub use registry::ResourceRegistry;
pub use routes::{RouteCipher, RouteObfuscator, RouteTable, RouteTarget};
pub use session::{build_login, complete_login, login, logout, MemorySessionStore, Session, SessionIdentity, SessionStore};
pub use transport::{BearerAuth, RequestOptions, TransportClient};
pub use types::{Credentials, LoginResponse, Page};
