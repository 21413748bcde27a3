//! The boundary to the remote permission authority.
//!
//! The authority persists scopes, endpoints and rule sets, and makes the
//! final access decision. Everything in this crate talks to it through
//! [`AuthorityClient`]; [`crate::HttpAuthority`] is the production
//! implementation and [`crate::InMemoryAuthority`] a local one for tests
//! and dry-runs.

use sg_endpoint::{EndpointRecord, Scope};

use crate::error::Result;
use crate::wire::{AccessCheck, EndpointPage, RuleCommit};

/// Blocking client for the permission authority.
///
/// Implementations surface every failure as an [`crate::AuthorityError`];
/// none of them retry.
pub trait AuthorityClient: Send + Sync {
    /// Short name for logs, e.g. `"http"`.
    fn name(&self) -> &str;

    /// Register declared scopes.
    fn register_scopes(&self, scopes: &[Scope]) -> Result<()>;

    /// Register declared endpoints.
    fn register_endpoints(&self, endpoints: &[EndpointRecord]) -> Result<()>;

    /// Fetch one page of the endpoints stored for `host`. `cursor` is the
    /// previous page's `paging.next`, or `None` for the first page.
    fn list_endpoints(&self, host: &str, cursor: Option<&str>) -> Result<EndpointPage>;

    /// Submit a batch of rule records for one subject.
    fn commit_rules(&self, commit: &RuleCommit) -> Result<()>;

    /// Ask whether a request may proceed.
    fn check_access(&self, check: &AccessCheck) -> Result<bool>;
}
