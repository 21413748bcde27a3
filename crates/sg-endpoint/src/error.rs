// error.rs: Error types for endpoint declaration and request resolution.
//
// Two families share this enum:
// - configuration errors are raised while declaring routes and must stop
//   the service from starting;
// - validation errors are raised while resolving an incoming request and
//   are reported back to the caller as a rejected request.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while declaring endpoints or resolving requests.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The application host is not an absolute http(s) URL.
    #[error("invalid application host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// The joined host + feature + template does not form a valid URI.
    #[error("invalid endpoint URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// An HTTP method name was not recognized.
    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    /// A scope was declared without an identifier.
    #[error("scope identifier must not be empty")]
    EmptyScopeIdentifier,

    /// A scope was declared without a description.
    #[error("scope '{identifier}' has an empty description")]
    EmptyScopeDescription { identifier: String },

    /// An endpoint referenced a scope that was never declared.
    #[error("endpoint {method} {path} references unknown scope '{scope}'")]
    UnknownScope {
        method: String,
        path: String,
        scope: String,
    },

    /// The same (method, URL template) was declared twice.
    #[error("endpoint {method} {url} is already declared")]
    DuplicateEndpoint { method: String, url: String },

    /// The ownership tier and owner parameter index do not fit together.
    #[error("invalid owner parameter index for {ownership} endpoint '{template}': {reason}")]
    InvalidOwnerIndex {
        ownership: String,
        template: String,
        reason: String,
    },

    /// The requested URL could not be parsed.
    #[error("invalid requested URL '{url}': {reason}")]
    InvalidRequestUrl { url: String, reason: String },

    /// The requested path has no `/v<N>` segment to split the feature root on.
    #[error("no version segment in requested path '{path}'")]
    MissingVersionSegment { path: String },

    /// The owner segment of a private subset path is not a valid identifier.
    #[error("invalid owner id segment '{segment}' in '{subset}'")]
    InvalidOwnerId { subset: String, segment: String },

    /// A subset path is too short for (or misaligned with) the owner index.
    #[error("owner index {index} does not fit subset '{subset}'")]
    OwnerIndexOutOfRange { subset: String, index: usize },

    /// `fill` was given the wrong number of parameter values.
    #[error("template '{template}' expects {expected} parameter(s), got {got}")]
    ParamCountMismatch {
        template: String,
        expected: usize,
        got: usize,
    },

    /// A fingerprint string is not 64 hex characters.
    #[error("invalid endpoint fingerprint '{value}': {reason}")]
    InvalidFingerprint { value: String, reason: String },

    /// An endpoint lifecycle transition is not allowed.
    #[error("invalid sync transition from {from} to {to} for {endpoint}")]
    InvalidTransition {
        endpoint: String,
        from: String,
        to: String,
    },

    /// A service manifest could not be read.
    #[error("failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A service manifest is not valid TOML for the expected shape.
    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),
}

impl EndpointError {
    /// True for errors raised while declaring routes (fatal at startup).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EndpointError::InvalidHost { .. }
                | EndpointError::InvalidUri { .. }
                | EndpointError::InvalidMethod(_)
                | EndpointError::EmptyScopeIdentifier
                | EndpointError::EmptyScopeDescription { .. }
                | EndpointError::UnknownScope { .. }
                | EndpointError::DuplicateEndpoint { .. }
                | EndpointError::InvalidOwnerIndex { .. }
                | EndpointError::ManifestRead { .. }
                | EndpointError::ManifestParse(_)
        )
    }

    /// True for errors caused by a malformed incoming request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EndpointError::InvalidRequestUrl { .. }
                | EndpointError::MissingVersionSegment { .. }
                | EndpointError::InvalidOwnerId { .. }
                | EndpointError::OwnerIndexOutOfRange { .. }
                | EndpointError::ParamCountMismatch { .. }
                | EndpointError::InvalidFingerprint { .. }
        )
    }
}
