// sync.rs: Synchronization pass between declared endpoints and the authority.
//
// The authority's listing is paged through from the first page until
// `paging.next` is null. Each listed record is matched to a local
// declaration by `(method, host, feature, pathTemplate)`; fingerprints are
// only used to find the candidate quickly, since some authorities issue
// their own ids. Anything still unconfirmed (or confirmed but inactive)
// after the last page is marked `SyncFailed`. Records that failed in an
// earlier pass stay failed and are reported again.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sg_endpoint::{EndpointFingerprint, EndpointRegistry, HttpMethod, SyncState};

use crate::client::AuthorityClient;
use crate::error::{AuthorityError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub method: HttpMethod,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Endpoints confirmed by the authority.
    pub synced: usize,
    /// Listing pages fetched.
    pub pages: usize,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn any failure into an error, for services that refuse to start
    /// half-registered.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let summary = self
            .failed
            .iter()
            .map(|f| format!("{} {} ({})", f.method, f.url, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Err(AuthorityError::SyncIncomplete {
            failed: self.failed.len(),
            summary,
        })
    }
}

/// Run one synchronization pass over `registry`.
///
/// A failed page aborts the pass with its error; endpoints keep whatever
/// state they reached.
pub fn synchronize<C>(client: &C, registry: &mut EndpointRegistry) -> Result<SyncReport>
where
    C: AuthorityClient + ?Sized,
{
    let host = registry.host().to_string();
    let mut report = SyncReport::default();

    let by_fingerprint: HashMap<EndpointFingerprint, usize> = registry
        .endpoints()
        .iter()
        .enumerate()
        .filter_map(|(i, record)| record.fingerprint.map(|fp| (fp, i)))
        .collect();

    let mut cursor: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        let page = client.list_endpoints(&host, cursor.as_deref())?;
        report.pages += 1;

        let endpoints = registry.endpoints_mut();
        for remote in &page.endpoints {
            let candidate = remote
                .fingerprint
                .and_then(|fp| by_fingerprint.get(&fp).copied())
                .filter(|&i| endpoints[i].matches_declaration(remote));
            let index = candidate.or_else(|| {
                endpoints
                    .iter()
                    .position(|local| local.matches_declaration(remote))
            });

            let Some(index) = index else {
                tracing::debug!(
                    method = %remote.method,
                    url = %remote.url(),
                    "listed endpoint not declared locally"
                );
                continue;
            };
            let local = &mut endpoints[index];
            if local.sync_state != SyncState::Declared {
                continue;
            }
            local.mark_synced(remote.fingerprint, remote.activated)?;
        }

        match page.paging.next {
            Some(next) if !seen.insert(next.clone()) => {
                return Err(AuthorityError::MalformedResponse {
                    url: next,
                    reason: "pagination cursor repeats an earlier page".to_string(),
                });
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    for record in registry.endpoints_mut() {
        let reason = match &record.sync_state {
            SyncState::Declared => "not found in authority listing".to_string(),
            SyncState::Synced if !record.activated => "not activated by the authority".to_string(),
            SyncState::Synced => continue,
            SyncState::SyncFailed { reason } => {
                report.failed.push(SyncFailure {
                    method: record.method,
                    url: record.url(),
                    reason: reason.clone(),
                });
                continue;
            }
        };
        tracing::warn!(
            method = %record.method,
            url = %record.url(),
            reason = %reason,
            "endpoint failed to synchronize"
        );
        report.failed.push(SyncFailure {
            method: record.method,
            url: record.url(),
            reason: reason.clone(),
        });
        record.mark_failed(reason)?;
    }

    report.synced = registry.endpoints().iter().filter(|r| r.is_synced()).count();
    tracing::info!(
        host = %host,
        synced = report.synced,
        failed = report.failed.len(),
        pages = report.pages,
        "endpoint synchronization finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAuthority;
    use crate::wire::{EndpointPage, Paging};
    use sg_endpoint::Ownership;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> EndpointRegistry {
        let mut registry = EndpointRegistry::new("https://notes.example.com").unwrap();
        registry.add_scope("notes.read", "Read notes").unwrap();
        let mut v1 = registry.feature("/v1");
        for path in ["/notes", "/notes/:id", "/notes/:id/comments"] {
            v1.declare(Ownership::Organization, HttpMethod::Get, path, &["notes.read"])
                .unwrap();
        }
        registry
    }

    #[test]
    fn registered_endpoints_sync_across_pages() {
        let authority = InMemoryAuthority::new().with_page_size(2);
        let mut registry = registry();
        authority.register_endpoints(registry.endpoints()).unwrap();

        let report = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(report.synced, 3);
        assert_eq!(report.pages, 2);
        assert!(report.ensure_complete().is_ok());
        assert!(registry.unsynced().next().is_none());
    }

    #[test]
    fn authority_assigned_ids_are_adopted() {
        let authority = InMemoryAuthority::new().assigning_fingerprints();
        let mut registry = registry();
        let local = registry.endpoints()[1].fingerprint;
        authority.register_endpoints(registry.endpoints()).unwrap();

        synchronize(&authority, &mut registry).unwrap();
        let adopted = registry.endpoints()[1].fingerprint;
        assert_ne!(adopted, local);
        assert_eq!(adopted, authority.endpoints()[1].fingerprint);
    }

    #[test]
    fn missing_endpoint_fails_sync() {
        let authority = InMemoryAuthority::new();
        let mut registry = registry();
        authority.register_endpoints(&registry.endpoints()[..2]).unwrap();

        let report = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].url.ends_with("/v1/notes/*/comments"));
        assert!(matches!(
            registry.endpoints()[2].sync_state,
            SyncState::SyncFailed { .. }
        ));
        let err = report.ensure_complete().unwrap_err();
        assert!(matches!(err, AuthorityError::SyncIncomplete { failed: 1, .. }));
    }

    #[test]
    fn inactive_endpoint_fails_sync() {
        let authority = InMemoryAuthority::new();
        let mut registry = registry();
        for record in registry.endpoints() {
            let mut stored = record.clone();
            stored.activated = record.path_template != "/notes";
            authority.seed_endpoint(stored);
        }

        let report = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed[0].reason, "not activated by the authority");
    }

    #[test]
    fn fingerprint_collision_defers_to_tuple() {
        let authority = InMemoryAuthority::new();
        let mut registry = registry();
        // Same fingerprint as /notes, but a different declaration.
        let mut impostor = registry.endpoints()[0].clone();
        impostor.feature = "/v9".into();
        impostor.activated = true;
        authority.seed_endpoint(impostor);

        let report = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.failed.len(), 3);
    }

    #[test]
    fn failed_page_aborts_pass() {
        let authority = InMemoryAuthority::new();
        let mut registry = registry();
        authority.register_endpoints(registry.endpoints()).unwrap();

        struct Broken<'a>(&'a InMemoryAuthority);
        impl AuthorityClient for Broken<'_> {
            fn name(&self) -> &str {
                "broken"
            }
            fn register_scopes(&self, s: &[sg_endpoint::Scope]) -> Result<()> {
                self.0.register_scopes(s)
            }
            fn register_endpoints(&self, e: &[sg_endpoint::EndpointRecord]) -> Result<()> {
                self.0.register_endpoints(e)
            }
            fn list_endpoints(
                &self,
                host: &str,
                cursor: Option<&str>,
            ) -> Result<crate::wire::EndpointPage> {
                match cursor {
                    None => {
                        let mut page = self.0.list_endpoints(host, None)?;
                        page.endpoints.truncate(1);
                        page.paging.next = Some("2".into());
                        Ok(page)
                    }
                    Some(_) => Err(AuthorityError::Transport {
                        url: "http://authority".into(),
                        reason: "connection reset".into(),
                    }),
                }
            }
            fn commit_rules(&self, c: &crate::wire::RuleCommit) -> Result<()> {
                self.0.commit_rules(c)
            }
            fn check_access(&self, c: &crate::wire::AccessCheck) -> Result<bool> {
                self.0.check_access(c)
            }
        }

        let err = synchronize(&Broken(&authority), &mut registry).unwrap_err();
        assert!(err.is_transport());
        // The first page's match stands; nothing was marked failed.
        assert!(registry.endpoints()[0].is_synced());
        assert_eq!(registry.endpoints()[2].sync_state, SyncState::Declared);
    }

    #[test]
    fn stuck_cursor_is_malformed() {
        struct Stuck;
        impl AuthorityClient for Stuck {
            fn name(&self) -> &str {
                "stuck"
            }
            fn register_scopes(&self, _: &[sg_endpoint::Scope]) -> Result<()> {
                Ok(())
            }
            fn register_endpoints(&self, _: &[sg_endpoint::EndpointRecord]) -> Result<()> {
                Ok(())
            }
            fn list_endpoints(&self, _: &str, _: Option<&str>) -> Result<EndpointPage> {
                Ok(EndpointPage {
                    endpoints: Vec::new(),
                    paging: Paging {
                        next: Some("same".into()),
                    },
                })
            }
            fn commit_rules(&self, _: &crate::wire::RuleCommit) -> Result<()> {
                Ok(())
            }
            fn check_access(&self, _: &crate::wire::AccessCheck) -> Result<bool> {
                Ok(false)
            }
        }

        let mut registry = registry();
        let err = synchronize(&Stuck, &mut registry).unwrap_err();
        assert!(matches!(err, AuthorityError::MalformedResponse { .. }));
    }

    #[test]
    fn earlier_failures_are_reported_again() {
        let authority = InMemoryAuthority::new();
        let mut registry = registry();
        authority.register_endpoints(&registry.endpoints()[..2]).unwrap();

        let first = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(first.failed.len(), 1);

        let second = synchronize(&authority, &mut registry).unwrap();
        assert_eq!(second.synced, 2);
        assert_eq!(second.failed, first.failed);
        assert_eq!(second.failed[0].reason, "not found in authority listing");
        assert!(second.ensure_complete().is_err());
        assert!(matches!(
            registry.endpoints()[2].sync_state,
            SyncState::SyncFailed { .. }
        ));
    }

    #[test]
    fn alternating_cursor_is_malformed() {
        struct Alternating(AtomicUsize);
        impl AuthorityClient for Alternating {
            fn name(&self) -> &str {
                "alternating"
            }
            fn register_scopes(&self, _: &[sg_endpoint::Scope]) -> Result<()> {
                Ok(())
            }
            fn register_endpoints(&self, _: &[sg_endpoint::EndpointRecord]) -> Result<()> {
                Ok(())
            }
            fn list_endpoints(&self, _: &str, _: Option<&str>) -> Result<EndpointPage> {
                let page = self.0.fetch_add(1, Ordering::SeqCst);
                assert!(page < 10, "pagination did not terminate");
                let next = if page % 2 == 0 { "a" } else { "b" };
                Ok(EndpointPage {
                    endpoints: Vec::new(),
                    paging: Paging {
                        next: Some(next.into()),
                    },
                })
            }
            fn commit_rules(&self, _: &crate::wire::RuleCommit) -> Result<()> {
                Ok(())
            }
            fn check_access(&self, _: &crate::wire::AccessCheck) -> Result<bool> {
                Ok(false)
            }
        }

        let client = Alternating(AtomicUsize::new(0));
        let mut registry = registry();
        let err = synchronize(&client, &mut registry).unwrap_err();
        assert!(matches!(err, AuthorityError::MalformedResponse { .. }));
        assert_eq!(client.0.load(Ordering::SeqCst), 3);
    }
}
