// commit.rs: Batched authorization changes.
//
// A `CommitBatcher` is scoped to one subject (the user or custodian whose
// rules change). Pending actions are grouped by `(write behavior, target
// endpoint)`; each group accumulates into one `AccessRuleSet` that is
// reduced and sent as a single record. A batch is single-use: `commit`
// consumes it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sg_endpoint::EndpointFingerprint;
use sg_rules::AccessRuleSet;
use uuid::Uuid;

use crate::client::AuthorityClient;
use crate::error::Result;
use crate::wire::{CommitRecord, RuleCommit, Subject};

/// What a pending change does to the target's rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Default grant; must not clobber an operator's existing rules.
    Assign,
    /// Explicit grant.
    Grant,
    /// Explicit revocation, recorded as an exception.
    Revoke,
}

impl RuleAction {
    pub fn write_behavior(&self) -> WriteBehavior {
        match self {
            RuleAction::Assign => WriteBehavior::CreateIfAbsent,
            RuleAction::Grant | RuleAction::Revoke => WriteBehavior::Overwrite,
        }
    }

    /// Revocations shadow subsets through exceptions; they never delete.
    pub fn is_exception(&self) -> bool {
        matches!(self, RuleAction::Revoke)
    }
}

/// How the authority stores a record's rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WriteBehavior {
    /// Store only if the subject has no rules for the target yet.
    #[serde(rename = "IF_NOT_EXISTS")]
    CreateIfAbsent,
    /// Replace whatever the subject has for the target.
    #[serde(rename = "OVERWRITE")]
    Overwrite,
}

impl WriteBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteBehavior::CreateIfAbsent => "IF_NOT_EXISTS",
            WriteBehavior::Overwrite => "OVERWRITE",
        }
    }
}

impl fmt::Display for WriteBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRuleChange {
    pub action: RuleAction,
    pub target: EndpointFingerprint,
    pub rule: String,
}

impl PendingRuleChange {
    pub fn new(action: RuleAction, target: EndpointFingerprint, rule: impl Into<String>) -> Self {
        Self {
            action,
            target,
            rule: rule.into(),
        }
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub subject: Subject,
    pub records: Vec<CommitRecord>,
    pub committed_at: DateTime<Utc>,
}

impl CommitSummary {
    /// True when the batch was empty and nothing was sent.
    pub fn is_noop(&self) -> bool {
        self.records.is_empty()
    }
}

/// Accumulates rule changes for one subject.
#[derive(Debug, Clone)]
pub struct CommitBatcher {
    subject: Subject,
    origin: Option<EndpointFingerprint>,
    buckets: BTreeMap<(WriteBehavior, EndpointFingerprint), AccessRuleSet>,
    pending: usize,
}

impl CommitBatcher {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            origin: None,
            buckets: BTreeMap::new(),
            pending: 0,
        }
    }

    /// Record the endpoint the change is issued from.
    pub fn with_origin(mut self, origin: EndpointFingerprint) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn origin(&self) -> Option<EndpointFingerprint> {
        self.origin
    }

    pub fn add_action(
        &mut self,
        action: RuleAction,
        target: EndpointFingerprint,
        rule: impl Into<String>,
    ) -> &mut Self {
        let rules = self
            .buckets
            .entry((action.write_behavior(), target))
            .or_default();
        if action.is_exception() {
            rules.add_exception(rule);
        } else {
            rules.add_subset(rule);
        }
        self.pending += 1;
        self
    }

    pub fn apply(&mut self, change: PendingRuleChange) -> &mut Self {
        self.add_action(change.action, change.target, change.rule)
    }

    /// Fluent builder for changes against one target endpoint.
    pub fn target(&mut self, target: EndpointFingerprint) -> TargetRules<'_> {
        TargetRules {
            batcher: self,
            target,
        }
    }

    /// Number of pending changes (not records).
    pub fn len(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// The reduced records a commit would send.
    pub fn records(&self) -> Vec<CommitRecord> {
        self.buckets
            .iter()
            .map(|((behavior, target), rules)| CommitRecord {
                behavior: *behavior,
                target_fingerprint: *target,
                access_rules: rules.clone().reduced(),
            })
            .collect()
    }

    /// What the authority would hold for `target` after this batch, given
    /// its current rules `base`. Overwrite records are applied after
    /// create-if-absent ones.
    pub fn preview(
        &self,
        target: &EndpointFingerprint,
        base: Option<&AccessRuleSet>,
    ) -> Option<AccessRuleSet> {
        let mut current = base.cloned();
        for ((behavior, bucket_target), rules) in &self.buckets {
            if bucket_target != target {
                continue;
            }
            match behavior {
                WriteBehavior::CreateIfAbsent if current.is_some() => {}
                _ => current = Some(rules.clone().reduced()),
            }
        }
        current
    }

    /// Send every record in one call. An empty batch sends nothing.
    pub fn commit<C>(self, client: &C, acting_identity: Uuid) -> Result<CommitSummary>
    where
        C: AuthorityClient + ?Sized,
    {
        let records = self.records();
        if records.is_empty() {
            tracing::debug!(subject = %self.subject, "empty rule batch - nothing to commit");
            return Ok(CommitSummary {
                subject: self.subject,
                records,
                committed_at: Utc::now(),
            });
        }

        let commit = RuleCommit {
            subject: self.subject,
            acting_identity,
            origin: self.origin,
            records,
        };
        client.commit_rules(&commit)?;
        tracing::info!(
            subject = %commit.subject,
            records = commit.records.len(),
            client = client.name(),
            "committed rule changes"
        );

        Ok(CommitSummary {
            subject: commit.subject,
            records: commit.records,
            committed_at: Utc::now(),
        })
    }
}

/// Changes against one target endpoint, e.g.
/// `batch.target(fp).grant("/notes/*").revoke("/notes/secret")`.
pub struct TargetRules<'a> {
    batcher: &'a mut CommitBatcher,
    target: EndpointFingerprint,
}

impl TargetRules<'_> {
    pub fn assign(&mut self, rule: impl Into<String>) -> &mut Self {
        self.batcher.add_action(RuleAction::Assign, self.target, rule);
        self
    }

    pub fn grant(&mut self, rule: impl Into<String>) -> &mut Self {
        self.batcher.add_action(RuleAction::Grant, self.target, rule);
        self
    }

    pub fn revoke(&mut self, rule: impl Into<String>) -> &mut Self {
        self.batcher.add_action(RuleAction::Revoke, self.target, rule);
        self
    }
}
