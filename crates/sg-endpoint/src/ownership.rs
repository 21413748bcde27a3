// ownership.rs: Ownership tiers attached to endpoints at declaration time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EndpointError;
use crate::template::PathTemplate;

/// Who a resource behind an endpoint belongs to.
///
/// - `Organization`: shared resources; custodians may be granted access.
/// - `Private`: resources owned by one user, whose id sits in the path.
/// - `Public`: anyone holding the endpoint's scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ownership {
    Organization,
    #[serde(alias = "DATA_OWNER")]
    Private,
    #[serde(alias = "NONE")]
    Public,
}

impl Ownership {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ownership::Organization => "ORGANIZATION",
            Ownership::Private => "PRIVATE",
            Ownership::Public => "PUBLIC",
        }
    }

    /// Only organization-owned endpoints accept per-custodian rule sets.
    pub fn allows_custodian_grants(&self) -> bool {
        matches!(self, Ownership::Organization)
    }

    /// Check the owner parameter index against this tier and template.
    pub fn validate_owner_index(
        &self,
        template: &PathTemplate,
        owner_index: Option<usize>,
    ) -> Result<(), EndpointError> {
        let invalid = |reason: String| EndpointError::InvalidOwnerIndex {
            ownership: self.to_string(),
            template: template.as_str().to_string(),
            reason,
        };

        match (self, owner_index) {
            (Ownership::Private, None) => {
                Err(invalid("private endpoints need an owner parameter index".into()))
            }
            (Ownership::Private, Some(index)) => {
                if index <= 1 || index % 2 != 0 {
                    return Err(invalid(format!("index {} must be even and greater than 1", index)));
                }
                match template.segment_at(index) {
                    Some(seg) if seg.is_param() => Ok(()),
                    Some(_) => Err(invalid(format!("segment {} is not a parameter", index))),
                    None => Err(invalid(format!(
                        "index {} is past the last segment ({} segments)",
                        index,
                        template.segment_count()
                    ))),
                }
            }
            (_, Some(index)) => Err(invalid(format!(
                "only private endpoints carry an owner index, got {}",
                index
            ))),
            (_, None) => Ok(()),
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
