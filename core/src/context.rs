//! Start-up wiring.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::http::HttpExecutor;
use crate::registry::ResourceRegistry;
use crate::routes::RouteObfuscator;
use crate::session::SessionStore;
use crate::transport::{BearerAuth, TransportClient};

/// Everything a screen needs to talk to the backend.
///
/// Built once by the application and passed down by reference; nothing in
/// the crate keeps global client instances.
pub struct ApiContext {
    pub resources: ResourceRegistry,
    pub desktop: Arc<TransportClient>,
    pub mobile: Arc<TransportClient>,
    pub routes: RouteObfuscator,
    pub session: Arc<dyn SessionStore>,
}

impl ApiContext {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>, executor: Arc<dyn HttpExecutor>) -> Self {
        let auth = Arc::new(
            BearerAuth::new(session.clone(), &config.login_path).with_unauthenticated(&config.unauthenticated_paths),
        );
        let desktop = Arc::new(TransportClient::new(&config.desktop, auth.clone(), executor.clone()));
        let mobile = Arc::new(TransportClient::new(&config.mobile, auth, executor));
        Self {
            resources: ResourceRegistry::builtin(desktop.clone()),
            desktop,
            mobile,
            routes: RouteObfuscator::new(&config.route_key),
            session,
        }
    }

    /// Context using the blocking `ureq` executor with the configured timeout.
    #[cfg(feature = "ureq")]
    pub fn connect(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Self {
        let executor = Arc::new(crate::executor::UreqExecutor::new(config.timeout()));
        Self::new(config, session, executor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::Entity;
    use crate::http::HostIo;
    use crate::session::{MemorySessionStore, TOKEN_KEY};
    use crate::transport::RequestOptions;

    #[test]
    fn both_audiences_share_the_session() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let ctx = ApiContext::new(&ClientConfig::default(), session.clone(), Arc::new(HostIo));
        session.set(TOKEN_KEY, "shared");

        let opts = RequestOptions::default();
        let desktop = ctx.resources.client(Entity::Bins).unwrap().build_list(&opts);
        let mobile = ctx
            .mobile
            .prepare(crate::http::HttpMethod::Get, "trips", None, &opts);

        assert_eq!(desktop.url, "http://localhost:8000/api/masters/bins/");
        assert_eq!(mobile.url, "http://localhost:8000/mobile-api/trips/");
        assert_eq!(desktop.header("Authorization"), Some("Bearer shared"));
        assert_eq!(mobile.header("Authorization"), Some("Bearer shared"));
        assert!(desktop.with_credentials);
        assert!(!mobile.with_credentials);
    }

    #[test]
    fn routes_use_configured_key() {
        let mut config = ClientConfig::default();
        config.route_key = "k1".to_string();
        let a = ApiContext::new(&config, Arc::new(MemorySessionStore::new()), Arc::new(HostIo));
        config.route_key = "k2".to_string();
        let b = ApiContext::new(&config, Arc::new(MemorySessionStore::new()), Arc::new(HostIo));
        assert_ne!(
            a.routes.encrypted_table().token("bins"),
            b.routes.encrypted_table().token("bins")
        );
    }

    #[test]
    fn configured_paths_skip_the_bearer() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        session.set(TOKEN_KEY, "tok");
        let config = ClientConfig {
            login_path: "accounts/sign-in".to_string(),
            unauthenticated_paths: vec!["auth/password-reset".to_string()],
            ..ClientConfig::default()
        };
        let ctx = ApiContext::new(&config, session, Arc::new(HostIo));
        let opts = RequestOptions::default();
        let post = crate::http::HttpMethod::Post;

        assert_eq!(ctx.desktop.login_path(), "/accounts/sign-in/");
        for transport in [&ctx.desktop, &ctx.mobile] {
            assert!(transport.prepare(post, "accounts/sign-in", None, &opts).header("Authorization").is_none());
            assert!(transport.prepare(post, "auth/password-reset", None, &opts).header("Authorization").is_none());
            assert!(transport.prepare(post, "auth/login", None, &opts).header("Authorization").is_some());
        }
    }
}
