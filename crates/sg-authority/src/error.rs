// error.rs: Error types for talking to the permission authority.
//
// Callers must be able to tell "the authority is unreachable" apart from
// "the authority said no": the first is an infrastructure failure, the
// second an authorization decision. `is_transport()` and `status_code()`
// encode that split.

use std::path::PathBuf;

use sg_endpoint::EndpointError;
use thiserror::Error;

/// Errors that can occur while registering, synchronizing, committing or
/// checking access against the authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The authority could not be reached.
    #[error("authority unreachable at {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The authority answered with a body that does not decode.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// A registration or commit was answered with an unexpected status.
    #[error("authority rejected {operation} (status {status}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// An access check was denied.
    #[error("access denied: {message}")]
    Forbidden { message: String },

    /// Declaration or request-resolution error.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// One or more endpoints did not end the synchronization pass synced.
    #[error("{failed} endpoint(s) failed to synchronize: {summary}")]
    SyncIncomplete { failed: usize, summary: String },

    /// Custodian rule sets were requested on an endpoint that is not
    /// organization-owned.
    #[error("custodian access rules need an organization endpoint, {endpoint} is {ownership}")]
    NotDelegable { endpoint: String, ownership: String },

    /// The authority configuration is missing or invalid.
    #[error("invalid authority configuration: {0}")]
    Config(String),

    /// An authority configuration file could not be read.
    #[error("failed to read authority config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An authority configuration file is not valid TOML.
    #[error("failed to parse authority config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl AuthorityError {
    /// True when the authority could not be reached or spoke nonsense.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AuthorityError::Transport { .. } | AuthorityError::MalformedResponse { .. }
        )
    }

    /// HTTP status a host service should answer its own caller with.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorityError::Forbidden { .. } => 403,
            AuthorityError::Transport { .. }
            | AuthorityError::MalformedResponse { .. }
            | AuthorityError::Rejected { .. } => 502,
            AuthorityError::Endpoint(e) if e.is_validation() => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthorityError>;
