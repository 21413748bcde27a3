// access.rs: The service-facing façade over a registry and an authority.
//
// `AccessControl` owns the declared endpoints and shares one client with
// every handle it builds. Registration, synchronization and local
// dry-runs all go through here.

use std::sync::Arc;

use sg_endpoint::{DeclaredEndpoint, EndpointRegistry, HttpMethod, RequestedEndpoint};
use sg_rules::{AccessExplanation, AccessRuleSet};

use crate::client::AuthorityClient;
use crate::error::Result;
use crate::handle::EndpointHandle;
use crate::sync::{self, SyncReport};

pub struct AccessControl {
    registry: EndpointRegistry,
    client: Arc<dyn AuthorityClient>,
}

impl AccessControl {
    pub fn new(registry: EndpointRegistry, client: Arc<dyn AuthorityClient>) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Mutable access, for declaring more endpoints before registration.
    pub fn registry_mut(&mut self) -> &mut EndpointRegistry {
        &mut self.registry
    }

    pub fn client(&self) -> &Arc<dyn AuthorityClient> {
        &self.client
    }

    /// Send all declared scopes, then all declared endpoints.
    pub fn register(&self) -> Result<()> {
        tracing::info!(
            host = %self.registry.host(),
            client = self.client.name(),
            scopes = self.registry.scopes().len(),
            endpoints = self.registry.len(),
            "registering with authority"
        );
        self.client.register_scopes(self.registry.scopes())?;
        self.client.register_endpoints(self.registry.endpoints())?;
        Ok(())
    }

    pub fn synchronize(&mut self) -> Result<SyncReport> {
        sync::synchronize(self.client.as_ref(), &mut self.registry)
    }

    /// Build a handle for a declaration, using the fingerprint the registry
    /// currently holds for it (the authority's, once synchronized).
    pub fn handle(&self, endpoint: &DeclaredEndpoint) -> EndpointHandle {
        let handle = EndpointHandle::new(endpoint.clone(), Arc::clone(&self.client));
        match self.registry.record_for(endpoint).and_then(|r| r.fingerprint) {
            Some(fingerprint) => handle.with_fingerprint(fingerprint),
            None => handle,
        }
    }

    /// Decide a request against `rules` without asking the authority.
    pub fn check_local(
        rules: &AccessRuleSet,
        method: HttpMethod,
        requested_url: &str,
    ) -> Result<bool> {
        let requested = RequestedEndpoint::resolve(method, requested_url)?;
        Ok(rules.can_access(&requested.subset))
    }

    /// Like [`check_local`](Self::check_local), reporting which rules decided.
    pub fn explain_local(
        rules: &AccessRuleSet,
        method: HttpMethod,
        requested_url: &str,
    ) -> Result<AccessExplanation> {
        let requested = RequestedEndpoint::resolve(method, requested_url)?;
        Ok(rules.explain(&requested.subset))
    }
}
