// memory.rs: In-process authority for tests and local dry-runs.
//
// Behaves like the remote authority as far as a client can observe:
// paged listings, write-behavior aware commits, and access checks decided
// by the stored rule sets. Every trait call is counted so callers can
// assert that nothing was sent.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use sg_endpoint::{
    EndpointFingerprint, EndpointRecord, Ownership, PathTemplate, RequestedEndpoint, Scope,
};
use sg_rules::AccessRuleSet;

use crate::client::AuthorityClient;
use crate::commit::WriteBehavior;
use crate::error::{AuthorityError, Result};
use crate::wire::{AccessCheck, EndpointPage, Paging, RuleCommit, Subject};

const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Default)]
struct State {
    scopes: Vec<Scope>,
    endpoints: Vec<EndpointRecord>,
    rules: HashMap<(Subject, EndpointFingerprint), AccessRuleSet>,
    commits: Vec<RuleCommit>,
    calls: usize,
    next_id: u64,
}

#[derive(Debug)]
pub struct InMemoryAuthority {
    state: Mutex<State>,
    page_size: usize,
    assigns_fingerprints: bool,
}

impl Default for InMemoryAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthority {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
            assigns_fingerprints: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace client-computed fingerprints with authority-issued ids.
    pub fn assigning_fingerprints(mut self) -> Self {
        self.assigns_fingerprints = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a record as-is, bypassing registration (and the call count).
    pub fn seed_endpoint(&self, record: EndpointRecord) {
        self.state().endpoints.push(record);
    }

    /// Store a rule set directly, bypassing commits.
    pub fn seed_rules(&self, subject: Subject, target: EndpointFingerprint, rules: AccessRuleSet) {
        self.state().rules.insert((subject, target), rules);
    }

    /// Number of trait calls served so far.
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    pub fn commits(&self) -> Vec<RuleCommit> {
        self.state().commits.clone()
    }

    pub fn scopes(&self) -> Vec<Scope> {
        self.state().scopes.clone()
    }

    pub fn endpoints(&self) -> Vec<EndpointRecord> {
        self.state().endpoints.clone()
    }

    pub fn rules_for(
        &self,
        subject: &Subject,
        target: &EndpointFingerprint,
    ) -> Option<AccessRuleSet> {
        self.state().rules.get(&(*subject, *target)).cloned()
    }

    fn issue_fingerprint(state: &mut State) -> EndpointFingerprint {
        state.next_id += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&state.next_id.to_be_bytes());
        EndpointFingerprint::from_bytes(bytes)
    }

    fn declared_fingerprint(record: &EndpointRecord) -> Option<EndpointFingerprint> {
        let template = PathTemplate::parse(&record.path_template);
        EndpointFingerprint::compute(record.method, &record.host, &record.feature, &template).ok()
    }

    fn decide(state: &State, check: &AccessCheck) -> Result<bool> {
        let requested = RequestedEndpoint::resolve(check.method, &check.url).map_err(|e| {
            AuthorityError::Forbidden {
                message: e.to_string(),
            }
        })?;

        // Compared by canonical URL: a host with a path prefix resolves into
        // a different host/feature split than the one it was declared with.
        let record = state
            .endpoints
            .iter()
            .find(|r| {
                r.method == requested.method
                    && Self::declared_fingerprint(r) == Some(requested.fingerprint)
            })
            .ok_or_else(|| AuthorityError::Forbidden {
                message: format!("unknown endpoint {} {}", check.method, check.url),
            })?;

        if !record.activated {
            return Err(AuthorityError::Forbidden {
                message: format!("endpoint {} {} is not activated", check.method, check.url),
            });
        }

        if record.ownership == Ownership::Public {
            return Ok(record.scopes.is_empty() || check.scopes.has_one_of(&record.scopes));
        }

        let Some(requester) = check.requester_id else {
            return Ok(false);
        };

        if let (Ownership::Private, Some(index)) = (record.ownership, record.owner_param_index) {
            let owned = sg_endpoint::OwnedSubset::parse(&requested.subset, index).map_err(|e| {
                AuthorityError::Forbidden {
                    message: e.to_string(),
                }
            })?;
            if owned.owner_id() == requester {
                return Ok(true);
            }
        }

        let Some(target) = record.fingerprint else {
            return Ok(false);
        };
        let allowed = [Subject::user(requester), Subject::custodian(requester)]
            .iter()
            .filter_map(|subject| state.rules.get(&(*subject, target)))
            .any(|rules| rules.can_access(&requested.subset));
        Ok(allowed)
    }
}

impl AuthorityClient for InMemoryAuthority {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn register_scopes(&self, scopes: &[Scope]) -> Result<()> {
        let mut state = self.state();
        state.calls += 1;
        for scope in scopes {
            match state.scopes.iter_mut().find(|s| s.identifier == scope.identifier) {
                Some(existing) => existing.description = scope.description.clone(),
                None => state.scopes.push(scope.clone()),
            }
        }
        Ok(())
    }

    fn register_endpoints(&self, endpoints: &[EndpointRecord]) -> Result<()> {
        let mut state = self.state();
        state.calls += 1;
        for record in endpoints {
            if let Some(existing) = state
                .endpoints
                .iter_mut()
                .find(|e| e.matches_declaration(record))
            {
                existing.ownership = record.ownership;
                existing.owner_param_index = record.owner_param_index;
                existing.scopes = record.scopes.clone();
                continue;
            }

            let fingerprint = match record.fingerprint {
                Some(fp) if !self.assigns_fingerprints => fp,
                _ => Self::issue_fingerprint(&mut state),
            };
            let mut stored = record.clone();
            stored.fingerprint = Some(fingerprint);
            stored.activated = true;
            stored.sync_state = Default::default();
            state.endpoints.push(stored);
        }
        Ok(())
    }

    fn list_endpoints(&self, host: &str, cursor: Option<&str>) -> Result<EndpointPage> {
        let mut state = self.state();
        state.calls += 1;

        let offset = match cursor {
            None => 0,
            Some(raw) => raw.parse::<usize>().map_err(|_| AuthorityError::Rejected {
                operation: "list endpoints".into(),
                status: 400,
                message: format!("invalid cursor '{}'", raw),
            })?,
        };

        let matching: Vec<&EndpointRecord> =
            state.endpoints.iter().filter(|e| e.host == host).collect();
        let end = (offset + self.page_size).min(matching.len());
        let endpoints = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|e| (*e).clone())
            .collect();
        let next = (end < matching.len()).then(|| end.to_string());

        Ok(EndpointPage {
            endpoints,
            paging: Paging { next },
        })
    }

    fn commit_rules(&self, commit: &RuleCommit) -> Result<()> {
        let mut state = self.state();
        state.calls += 1;
        for record in &commit.records {
            let key = (commit.subject, record.target_fingerprint);
            match record.behavior {
                WriteBehavior::CreateIfAbsent => {
                    state
                        .rules
                        .entry(key)
                        .or_insert_with(|| record.access_rules.clone());
                }
                WriteBehavior::Overwrite => {
                    state.rules.insert(key, record.access_rules.clone());
                }
            }
        }
        state.commits.push(commit.clone());
        Ok(())
    }

    fn check_access(&self, check: &AccessCheck) -> Result<bool> {
        let mut state = self.state();
        state.calls += 1;
        Self::decide(&state, check)
    }
}
