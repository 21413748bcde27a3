// handle.rs: Per-endpoint handle returned to the declaring service.
//
// A handle holds its collaborators by name: the declared endpoint and the
// authority client. It exposes only the operations a route handler needs.

use std::fmt;
use std::sync::Arc;

use sg_endpoint::{DeclaredEndpoint, EndpointFingerprint};
use sg_rules::Identifiers;
use uuid::Uuid;

use crate::client::AuthorityClient;
use crate::commit::{CommitBatcher, CommitSummary};
use crate::error::{AuthorityError, Result};
use crate::wire::{AccessCheck, Subject};

#[derive(Clone)]
pub struct EndpointHandle {
    endpoint: DeclaredEndpoint,
    fingerprint: EndpointFingerprint,
    client: Arc<dyn AuthorityClient>,
}

impl EndpointHandle {
    pub fn new(endpoint: DeclaredEndpoint, client: Arc<dyn AuthorityClient>) -> Self {
        Self {
            fingerprint: endpoint.fingerprint,
            endpoint,
            client,
        }
    }

    /// Use the authority's id for this endpoint instead of the local one.
    pub fn with_fingerprint(mut self, fingerprint: EndpointFingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn endpoint(&self) -> &DeclaredEndpoint {
        &self.endpoint
    }

    /// The id rule changes and checks refer to this endpoint by.
    pub fn fingerprint(&self) -> EndpointFingerprint {
        self.fingerprint
    }

    /// Ask the authority whether `requester` may call this endpoint on
    /// `subset_path` (the concrete path below the feature root).
    pub fn can_be_accessed_by(&self, requester: Uuid, subset_path: &str) -> Result<()> {
        let url = self.endpoint.subset_url(subset_path);
        let check = AccessCheck::for_requester(self.endpoint.method, url.as_str(), requester);
        self.decide(&check)
    }

    /// Scope-based variant, for public endpoints.
    pub fn can_be_accessed_with(&self, scopes: &Identifiers, subset_path: &str) -> Result<()> {
        let url = self.endpoint.subset_url(subset_path);
        let check = AccessCheck::for_scopes(self.endpoint.method, url.as_str(), scopes.clone());
        self.decide(&check)
    }

    fn decide(&self, check: &AccessCheck) -> Result<()> {
        if self.client.check_access(check)? {
            return Ok(());
        }
        tracing::debug!(method = %check.method, url = %check.url, "access denied by authority");
        Err(AuthorityError::Forbidden {
            message: format!("{} {} is not permitted", check.method, check.url),
        })
    }

    /// Start a rule batch for `custodian`, issued from this endpoint.
    pub fn set_access_rules_for(&self, custodian: Uuid) -> Result<CommitBatcher> {
        if !self.endpoint.ownership.allows_custodian_grants() {
            return Err(AuthorityError::NotDelegable {
                endpoint: format!("{} {}", self.endpoint.method, self.endpoint.template),
                ownership: self.endpoint.ownership.to_string(),
            });
        }
        Ok(CommitBatcher::new(Subject::custodian(custodian)).with_origin(self.fingerprint))
    }

    /// For private endpoints: the rule that gives `requester` the same
    /// access the owner has on `subset_path`.
    pub fn owner_rule_for(&self, subset_path: &str, requester: Uuid) -> Result<String> {
        let owned = self.endpoint.owned_subset(subset_path)?;
        Ok(owned.rule_for(requester))
    }

    /// Commit a batch through this handle's client.
    pub fn commit(&self, batch: CommitBatcher, acting_identity: Uuid) -> Result<CommitSummary> {
        batch.commit(self.client.as_ref(), acting_identity)
    }
}

impl fmt::Debug for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHandle")
            .field("endpoint", &self.endpoint)
            .field("fingerprint", &self.fingerprint)
            .field("client", &self.client.name())
            .finish()
    }
}
