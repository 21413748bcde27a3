// registry.rs: Scopes, endpoint records and the explicit endpoint registry.
//
// A service builds one `EndpointRegistry` at startup, declares its scopes
// and routes through it, then hands it to the authority layer for
// registration and synchronization. Every declaration is validated
// immediately; a malformed route never makes it into the registry.

use std::fmt;

use serde::{Deserialize, Serialize};
use sg_rules::Identifiers;

use crate::error::EndpointError;
use crate::fingerprint::{canonical_url, normalize_feature, normalize_host, EndpointFingerprint};
use crate::method::HttpMethod;
use crate::ownership::Ownership;
use crate::template::{clean_segments, OwnedSubset, PathTemplate};

/// A named permission grouping endpoints are registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub identifier: String,
    pub description: String,
}

impl Scope {
    pub fn new(
        identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, EndpointError> {
        let identifier = identifier.into();
        let description = description.into();
        if identifier.trim().is_empty() {
            return Err(EndpointError::EmptyScopeIdentifier);
        }
        if description.trim().is_empty() {
            return Err(EndpointError::EmptyScopeDescription { identifier });
        }
        Ok(Self {
            identifier,
            description,
        })
    }
}

/// Lifecycle of an endpoint with respect to the authority.
///
/// ```text
/// Declared ──► Synced
///    │           │
///    └───────────┴──► SyncFailed
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Fingerprint computed locally, not yet confirmed by the authority.
    #[default]
    Declared,
    /// The authority holds a matching, activated record.
    Synced,
    /// Terminal for this run.
    SyncFailed { reason: String },
}

impl SyncState {
    pub fn can_transition_to(&self, next: &SyncState) -> bool {
        if matches!(next, SyncState::SyncFailed { .. }) {
            return true;
        }
        matches!((self, next), (SyncState::Declared, SyncState::Synced))
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Declared => write!(f, "declared"),
            SyncState::Synced => write!(f, "synced"),
            SyncState::SyncFailed { reason } => write!(f, "sync_failed: {}", reason),
        }
    }
}

/// An endpoint as exchanged with the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<EndpointFingerprint>,
    pub ownership: Ownership,
    pub method: HttpMethod,
    pub host: String,
    pub feature: String,
    pub path_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_param_index: Option<usize>,
    #[serde(default)]
    pub scopes: Identifiers,
    #[serde(default)]
    pub activated: bool,
    #[serde(skip)]
    pub sync_state: SyncState,
}

impl EndpointRecord {
    /// Tuple equality over `(method, host, feature, pathTemplate)`.
    pub fn matches_declaration(&self, other: &EndpointRecord) -> bool {
        self.method == other.method
            && self.host == other.host
            && self.feature == other.feature
            && self.path_template == other.path_template
    }

    /// `host + feature + pathTemplate`, for display and diagnostics.
    pub fn url(&self) -> String {
        join_url(&self.host, &[&self.feature, &self.path_template])
    }

    pub fn is_synced(&self) -> bool {
        self.sync_state == SyncState::Synced
    }

    fn transition(&mut self, next: SyncState) -> Result<(), EndpointError> {
        if !self.sync_state.can_transition_to(&next) {
            return Err(EndpointError::InvalidTransition {
                endpoint: format!("{} {}", self.method, self.url()),
                from: self.sync_state.to_string(),
                to: next.to_string(),
            });
        }
        self.sync_state = next;
        Ok(())
    }

    /// Confirm against the authority's copy, adopting its fingerprint when
    /// it assigned one.
    pub fn mark_synced(
        &mut self,
        fingerprint: Option<EndpointFingerprint>,
        activated: bool,
    ) -> Result<(), EndpointError> {
        self.transition(SyncState::Synced)?;
        if let Some(fingerprint) = fingerprint.filter(|fp| !fp.is_zero()) {
            self.fingerprint = Some(fingerprint);
        }
        self.activated = activated;
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), EndpointError> {
        self.transition(SyncState::SyncFailed {
            reason: reason.into(),
        })
    }
}

/// The value handed back by a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEndpoint {
    pub method: HttpMethod,
    pub host: String,
    pub feature: String,
    pub template: PathTemplate,
    pub fingerprint: EndpointFingerprint,
    pub ownership: Ownership,
    pub owner_index: Option<usize>,
}

impl DeclaredEndpoint {
    /// Absolute URL of a concrete subset under this endpoint's feature.
    pub fn subset_url(&self, subset: &str) -> String {
        join_url(&self.host, &[&self.feature, subset])
    }

    /// Parse a concrete subset of a private endpoint.
    pub fn owned_subset(&self, subset: &str) -> Result<OwnedSubset, EndpointError> {
        let index = self.owner_index.ok_or_else(|| EndpointError::InvalidOwnerIndex {
            ownership: self.ownership.to_string(),
            template: self.template.as_str().to_string(),
            reason: "endpoint has no owner parameter".to_string(),
        })?;
        OwnedSubset::parse(subset, index)
    }

    fn tuple_matches(&self, record: &EndpointRecord) -> bool {
        self.method == record.method
            && self.host == record.host
            && self.feature == record.feature
            && self.template.as_str() == record.path_template
    }
}

fn join_url(host: &str, parts: &[&str]) -> String {
    let mut url = host.trim_end_matches('/').to_string();
    for part in parts {
        for seg in clean_segments(part) {
            url.push('/');
            url.push_str(seg);
        }
    }
    url
}

/// Explicit registry of everything one service declares.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    host: String,
    scopes: Vec<Scope>,
    endpoints: Vec<EndpointRecord>,
    declared: Vec<DeclaredEndpoint>,
}

impl EndpointRegistry {
    pub fn new(app_host: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            host: normalize_host(app_host)?,
            scopes: Vec::new(),
            endpoints: Vec::new(),
            declared: Vec::new(),
        })
    }

    /// Normalized application host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Declare a scope. Re-declaring an identifier keeps the first description.
    pub fn add_scope(
        &mut self,
        identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&Scope, EndpointError> {
        let scope = Scope::new(identifier, description)?;
        let index = match self
            .scopes
            .iter()
            .position(|s| s.identifier == scope.identifier)
        {
            Some(index) => {
                tracing::debug!(scope = %scope.identifier, "scope already declared");
                index
            }
            None => {
                self.scopes.push(scope);
                self.scopes.len() - 1
            }
        };
        Ok(&self.scopes[index])
    }

    /// Start declaring endpoints under a feature root such as `/v1`.
    pub fn feature(&mut self, root: &str) -> FeatureDeclarer<'_> {
        FeatureDeclarer {
            root: normalize_feature(root),
            registry: self,
        }
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn endpoints(&self) -> &[EndpointRecord] {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut [EndpointRecord] {
        &mut self.endpoints
    }

    /// Declarations in the order they were made, parameter names intact.
    pub fn declared(&self) -> &[DeclaredEndpoint] {
        &self.declared
    }

    pub fn find(&self, fingerprint: &EndpointFingerprint) -> Option<&EndpointRecord> {
        self.endpoints
            .iter()
            .find(|record| record.fingerprint.as_ref() == Some(fingerprint))
    }

    /// The registry's current record for a declaration, by tuple.
    pub fn record_for(&self, endpoint: &DeclaredEndpoint) -> Option<&EndpointRecord> {
        self.endpoints
            .iter()
            .find(|record| endpoint.tuple_matches(record))
    }

    /// Records not yet confirmed by the authority.
    pub fn unsynced(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.endpoints.iter().filter(|record| !record.is_synced())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn declare_endpoint(
        &mut self,
        feature: &str,
        ownership: Ownership,
        method: HttpMethod,
        path: &str,
        owner_index: Option<usize>,
        scopes: &[&str],
    ) -> Result<DeclaredEndpoint, EndpointError> {
        let template = PathTemplate::parse(path);
        ownership.validate_owner_index(&template, owner_index)?;

        for scope in scopes {
            if !self.scopes.iter().any(|s| s.identifier == *scope) {
                return Err(EndpointError::UnknownScope {
                    method: method.to_string(),
                    path: template.as_str().to_string(),
                    scope: scope.to_string(),
                });
            }
        }

        let url = canonical_url(&self.host, feature, &template)?;
        let fingerprint = EndpointFingerprint::compute(method, &self.host, feature, &template)?;
        let declared = DeclaredEndpoint {
            method,
            host: self.host.clone(),
            feature: feature.to_string(),
            template,
            fingerprint,
            ownership,
            owner_index,
        };

        if self.record_for(&declared).is_some() {
            return Err(EndpointError::DuplicateEndpoint {
                method: method.to_string(),
                url: url.to_string(),
            });
        }

        self.endpoints.push(EndpointRecord {
            fingerprint: Some(fingerprint),
            ownership,
            method,
            host: declared.host.clone(),
            feature: declared.feature.clone(),
            path_template: declared.template.as_str().to_string(),
            owner_param_index: owner_index,
            scopes: Identifiers::from_list(scopes.iter().copied()),
            activated: false,
            sync_state: SyncState::Declared,
        });
        self.declared.push(declared.clone());
        tracing::debug!(%method, %url, %fingerprint, %ownership, "declared endpoint");
        Ok(declared)
    }
}

/// Declares endpoints under one feature root of a registry.
pub struct FeatureDeclarer<'a> {
    registry: &'a mut EndpointRegistry,
    root: String,
}

impl FeatureDeclarer<'_> {
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Declare an organization or public endpoint.
    pub fn declare(
        &mut self,
        ownership: Ownership,
        method: HttpMethod,
        path: &str,
        scopes: &[&str],
    ) -> Result<DeclaredEndpoint, EndpointError> {
        self.registry
            .declare_endpoint(&self.root, ownership, method, path, None, scopes)
    }

    /// Declare a private endpoint whose owner id sits at `owner_index`.
    pub fn declare_private(
        &mut self,
        method: HttpMethod,
        path: &str,
        owner_index: usize,
        scopes: &[&str],
    ) -> Result<DeclaredEndpoint, EndpointError> {
        self.registry.declare_endpoint(
            &self.root,
            Ownership::Private,
            method,
            path,
            Some(owner_index),
            scopes,
        )
    }

    pub(crate) fn declare_with_index(
        &mut self,
        ownership: Ownership,
        method: HttpMethod,
        path: &str,
        owner_index: Option<usize>,
        scopes: &[&str],
    ) -> Result<DeclaredEndpoint, EndpointError> {
        self.registry
            .declare_endpoint(&self.root, ownership, method, path, owner_index, scopes)
    }
}
