// wire.rs: JSON shapes exchanged with the permission authority.

use std::fmt;

use serde::{Deserialize, Serialize};
use sg_endpoint::{EndpointFingerprint, EndpointRecord, HttpMethod};
use sg_rules::{AccessRuleSet, Identifiers};
use uuid::Uuid;

use crate::commit::WriteBehavior;

/// Identity of whoever is making a change.
pub const ACTING_IDENTITY_HEADER: &str = "X-Acting-Identity";
/// Endpoint a rule change was issued from.
pub const ENDPOINT_ID_HEADER: &str = "X-Endpoint-Id";
/// Subject whose rules a change applies to.
pub const SUBJECT_ID_HEADER: &str = "X-Subject-Id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Cursor for the next page; `None` on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of the endpoint listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPage {
    #[serde(default)]
    pub endpoints: Vec<EndpointRecord>,
    #[serde(default)]
    pub paging: Paging,
}

/// Namespace a rule change applies under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Users,
    Custodians,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Users => "users",
            SubjectKind::Custodians => "custodians",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: Uuid,
}

impl Subject {
    pub fn user(id: Uuid) -> Self {
        Self {
            kind: SubjectKind::Users,
            id,
        }
    }

    pub fn custodian(id: Uuid) -> Self {
        Self {
            kind: SubjectKind::Custodians,
            id,
        }
    }

    /// Path under the permissions prefix, e.g. `users/<id>`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)
    }
}

/// One `(behavior, target)` bucket of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub behavior: WriteBehavior,
    pub target_fingerprint: EndpointFingerprint,
    pub access_rules: AccessRuleSet,
}

/// Everything one commit call carries. Only `records` is the body; the
/// rest travels in the path and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCommit {
    pub subject: Subject,
    pub acting_identity: Uuid,
    pub origin: Option<EndpointFingerprint>,
    pub records: Vec<CommitRecord>,
}

/// Body of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub method: HttpMethod,
    /// Absolute requested URL.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Identifiers::is_empty")]
    pub scopes: Identifiers,
}

impl AccessCheck {
    pub fn for_requester(method: HttpMethod, url: impl Into<String>, requester: Uuid) -> Self {
        Self {
            method,
            url: url.into(),
            requester_id: Some(requester),
            scopes: Identifiers::new(),
        }
    }

    pub fn for_scopes(method: HttpMethod, url: impl Into<String>, scopes: Identifiers) -> Self {
        Self {
            method,
            url: url.into(),
            requester_id: None,
            scopes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessVerdict {
    pub can_access: bool,
}

/// Error body the authority attaches to non-2xx answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
}
