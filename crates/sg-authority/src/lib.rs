//! # sg-authority
//!
//! Everything Scopegate sends to the permission authority: registration of
//! scopes and endpoints, the synchronization pass that confirms them,
//! batched rule-set commits, and per-endpoint access checks.
//!
//! An [`AccessControl`] owns the service's [`sg_endpoint::EndpointRegistry`]
//! and an [`AuthorityClient`]. It hands out [`EndpointHandle`]s that route
//! handlers use to check access or start a [`CommitBatcher`].
//!
//! ## Key invariants
//!
//! - **One call per commit**: a non-empty batch is sent in exactly one
//!   `commit_rules` call; an empty batch sends nothing.
//! - **Tuple is truth**: synchronization matches listed endpoints by
//!   `(method, host, feature, pathTemplate)`, never by fingerprint alone.
//! - **Denied is not down**: a negative verdict is
//!   [`AuthorityError::Forbidden`]; an unreachable authority is
//!   [`AuthorityError::Transport`].

pub mod access;
pub mod client;
pub mod commit;
pub mod config;
pub mod error;
pub mod handle;
pub mod http;
pub mod memory;
pub mod sync;
pub mod wire;

pub use access::AccessControl;
pub use client::AuthorityClient;
pub use commit::{
    CommitBatcher, CommitSummary, PendingRuleChange, RuleAction, TargetRules, WriteBehavior,
};
pub use config::AuthorityConfig;
pub use error::{AuthorityError, Result};
pub use handle::EndpointHandle;
pub use http::HttpAuthority;
pub use memory::InMemoryAuthority;
pub use sync::{synchronize, SyncFailure, SyncReport};
pub use wire::{
    AccessCheck, AccessVerdict, ApiMessage, CommitRecord, EndpointPage, Paging, RuleCommit, Subject,
    SubjectKind, ACTING_IDENTITY_HEADER, ENDPOINT_ID_HEADER, SUBJECT_ID_HEADER,
};
