//! # sg-endpoint
//!
//! Endpoint identity for Scopegate.
//!
//! A service declares its routes through an [`EndpointRegistry`]. Each
//! declaration normalizes the route path into a [`PathTemplate`] (parameter
//! segments become `*`) and computes an [`EndpointFingerprint`] from the
//! method and the canonical URL. Incoming requests are resolved with
//! [`RequestedEndpoint::resolve`], which reaches the same fingerprint and
//! also yields the concrete subset path that access rules are checked
//! against.
//!
//! ## Key invariants
//!
//! - **Stable identity**: a fingerprint depends only on the method and the
//!   canonical URL, never on process state.
//! - **Parameter blindness**: two requests that differ only in a resource-id
//!   segment resolve to the same fingerprint.
//! - **Fail fast**: malformed declarations are configuration errors raised
//!   at declaration time, never at request time.

pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod method;
pub mod ownership;
pub mod registry;
pub mod template;

pub use error::EndpointError;
pub use fingerprint::{
    canonical_url, normalize_feature, normalize_host, EndpointFingerprint, RequestedEndpoint,
};
pub use manifest::ServiceManifest;
pub use method::HttpMethod;
pub use ownership::Ownership;
pub use registry::{
    DeclaredEndpoint, EndpointRecord, EndpointRegistry, FeatureDeclarer, Scope, SyncState,
};
pub use template::{OwnedSubset, PathTemplate, Segment, PARAM_WILDCARD};
