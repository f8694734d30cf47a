//! One `ResourceClient` per registered endpoint, looked up by logical name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::ResourceClient;
use crate::endpoints::{EndpointDescriptor, EndpointRegistry};
use crate::error::ApiError;
use crate::transport::TransportClient;

/// Immutable set of resource clients sharing one transport.
///
/// Keys are exactly the logical names of the endpoint table it was built
/// from. Build it once at start-up and hand out `&ResourceRegistry`.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    clients: BTreeMap<String, ResourceClient>,
}

impl ResourceRegistry {
    /// Build from raw descriptors, rejecting duplicate names.
    pub fn build<I>(transport: Arc<TransportClient>, descriptors: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = EndpointDescriptor>,
    {
        let endpoints = EndpointRegistry::from_descriptors(descriptors)?;
        Ok(Self::from_endpoints(transport, &endpoints))
    }

    pub fn from_endpoints(transport: Arc<TransportClient>, endpoints: &EndpointRegistry) -> Self {
        let clients: BTreeMap<_, _> = endpoints
            .descriptors()
            .map(|d| {
                (
                    d.logical_name.clone(),
                    ResourceClient::new(&d.resource_path, transport.clone()),
                )
            })
            .collect();
        tracing::info!(resources = clients.len(), base_url = transport.base_url(), "resource registry built");
        Self { clients }
    }

    /// Registry over every built-in `Entity`.
    pub fn builtin(transport: Arc<TransportClient>) -> Self {
        Self::from_endpoints(transport, &EndpointRegistry::builtin())
    }

    /// Client for `name`; accepts an `Entity` or a plain string.
    pub fn client(&self, name: impl AsRef<str>) -> Result<&ResourceClient, ApiError> {
        let name = name.as_ref();
        self.clients
            .get(name)
            .ok_or_else(|| ApiError::UnknownEntity(name.to_string()))
    }

    /// Logical names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
