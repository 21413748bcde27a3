// error.rs: Error types for rule compilation.

use thiserror::Error;

/// Errors that can occur while working with access rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule pattern could not be compiled into a matcher.
    #[error("invalid rule pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
