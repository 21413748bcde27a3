// rules.rs: Access rule sets: subsets (grants) and exceptions (revocations).
//
// An AccessRuleSet answers one question: may the requester reach this
// concrete subset path? The answer is yes iff some subset rule covers the
// path AND no exception rule covers it. Exceptions always win. This models
// "grant broad access, then carve out a revoked region":
//
//   subsets    = ["projects/*"]
//   exceptions = ["projects/secret"]
//   can_access("projects/public") → true
//   can_access("projects/secret") → false

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pattern::{remove_redundant, PatternMatcher};

/// A pair of rule collections attached to one (subject, endpoint) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRuleSet {
    /// Rules describing granted subset paths.
    #[serde(default)]
    pub subsets: Vec<String>,
    /// Rules describing subset paths carved out of the grants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<String>,
}

/// Why `can_access` decided the way it did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessExplanation {
    /// The subset path that was evaluated.
    pub subset: String,
    /// The final decision.
    pub allowed: bool,
    /// The subset rule that granted the path, if any.
    pub matched_subset: Option<String>,
    /// The exception rule that vetoed the grant, if any.
    pub matched_exception: Option<String>,
}

impl AccessRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from explicit subset and exception lists.
    pub fn with_rules<S, E>(subsets: S, exceptions: E) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            subsets: subsets.into_iter().map(Into::into).collect(),
            exceptions: exceptions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty() && self.exceptions.is_empty()
    }

    pub fn add_subset(&mut self, rule: impl Into<String>) {
        self.subsets.push(rule.into());
    }

    pub fn add_exception(&mut self, rule: impl Into<String>) {
        self.exceptions.push(rule.into());
    }

    /// Reduce both collections in place (see [`remove_redundant`]).
    pub fn remove_redundant(&mut self) {
        self.subsets = remove_redundant(&self.subsets);
        self.exceptions = remove_redundant(&self.exceptions);
    }

    /// Owned form of [`AccessRuleSet::remove_redundant`].
    pub fn reduced(mut self) -> Self {
        self.remove_redundant();
        self
    }

    /// Union `other` into this set (subsets with subsets, exceptions with
    /// exceptions), then reduce.
    pub fn merge(&mut self, other: &AccessRuleSet) {
        self.subsets.extend(other.subsets.iter().cloned());
        self.exceptions.extend(other.exceptions.iter().cloned());
        self.remove_redundant();
    }

    /// True iff `subset` is covered by a subset rule and by no exception rule.
    pub fn can_access(&self, subset: &str) -> bool {
        if !PatternMatcher::new(&self.subsets).is_covered(subset) {
            return false;
        }
        !PatternMatcher::new(&self.exceptions).is_covered(subset)
    }

    /// Same decision as [`AccessRuleSet::can_access`], with the rules that produced it.
    pub fn explain(&self, subset: &str) -> AccessExplanation {
        let subsets = PatternMatcher::new(&self.subsets);
        let matched_subset = subsets.covering_rule(subset).map(str::to_string);

        // Exceptions only matter once a subset has granted the path.
        let matched_exception = match matched_subset {
            Some(_) => PatternMatcher::new(&self.exceptions)
                .covering_rule(subset)
                .map(str::to_string),
            None => None,
        };

        AccessExplanation {
            subset: subset.to_string(),
            allowed: matched_subset.is_some() && matched_exception.is_none(),
            matched_subset,
            matched_exception,
        }
    }

    /// Set equality of both collections after reduction.
    pub fn equivalent(&self, other: &AccessRuleSet) -> bool {
        let left = self.clone().reduced();
        let right = other.clone().reduced();
        as_set(&left.subsets) == as_set(&right.subsets)
            && as_set(&left.exceptions) == as_set(&right.exceptions)
    }
}

fn as_set(rules: &[String]) -> BTreeSet<&str> {
    rules.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(subsets: &[&str], exceptions: &[&str]) -> AccessRuleSet {
        AccessRuleSet::with_rules(subsets.iter().copied(), exceptions.iter().copied())
    }

    #[test]
    fn exception_vetoes_subset() {
        let set = rules(&["a/*"], &["a/secret"]);
        assert!(!set.can_access("a/secret"));
        assert!(set.can_access("a/public"));
    }

    #[test]
    fn exception_alone_grants_nothing() {
        let set = rules(&[], &["a/*"]);
        assert!(!set.can_access("b/c"));
        assert!(!set.can_access("a/c"));
    }

    #[test]
    fn empty_set_denies_everything() {
        let set = AccessRuleSet::new();
        assert!(set.is_empty());
        assert!(!set.can_access("anything"));
        assert!(!set.can_access(""));
    }

    #[test]
    fn wildcard_exception_carves_region() {
        let set = rules(&["orgs/*"], &["orgs/acme/billing/*"]);
        assert!(set.can_access("orgs/acme/members"));
        assert!(!set.can_access("orgs/acme/billing/2024"));
    }

    #[test]
    fn explain_reports_granting_and_vetoing_rules() {
        let set = rules(&["a/*", "b/c"], &["a/secret"]);

        let granted = set.explain("b/c");
        assert!(granted.allowed);
        assert_eq!(granted.matched_subset.as_deref(), Some("b/c"));
        assert_eq!(granted.matched_exception, None);

        let vetoed = set.explain("a/secret");
        assert!(!vetoed.allowed);
        assert_eq!(vetoed.matched_subset.as_deref(), Some("a/*"));
        assert_eq!(vetoed.matched_exception.as_deref(), Some("a/secret"));

        let ungranted = set.explain("z");
        assert!(!ungranted.allowed);
        assert_eq!(ungranted.matched_subset, None);
    }

    #[test]
    fn explain_agrees_with_can_access() {
        let set = rules(&["x/*", "y"], &["x/1", "y"]);
        for subset in ["x/1", "x/2", "y", "z"] {
            assert_eq!(set.explain(subset).allowed, set.can_access(subset));
        }
    }

    #[test]
    fn remove_redundant_reduces_both_collections() {
        let mut set = rules(&["a/*", "a/b", "a/b"], &["a/x/*", "a/x/y"]);
        set.remove_redundant();
        assert_eq!(set.subsets, vec!["a/*"]);
        assert_eq!(set.exceptions, vec!["a/x/*"]);
    }

    #[test]
    fn merge_unions_matching_collections() {
        let mut base = rules(&["a/1"], &["a/1/private"]);
        base.merge(&rules(&["a/2"], &["a/2/private"]));
        assert_eq!(base.subsets, vec!["a/1", "a/2"]);
        assert_eq!(base.exceptions, vec!["a/1/private", "a/2/private"]);
    }

    #[test]
    fn merge_reduces_against_incoming_wildcards() {
        let mut base = rules(&["a/1", "a/2"], &[]);
        base.merge(&rules(&["a/*"], &[]));
        assert_eq!(base.subsets, vec!["a/*"]);
    }

    #[test]
    fn merge_with_self_is_equivalent() {
        let original = rules(&["a/*", "b/c", "b/c"], &["a/x"]);
        let mut merged = original.clone();
        merged.merge(&original);
        assert!(merged.equivalent(&original));
        assert_eq!(merged, original.clone().reduced());
    }

    #[test]
    fn equivalence_ignores_order_and_redundancy() {
        let left = rules(&["b", "a/*", "a/1"], &[]);
        let right = rules(&["a/*", "b"], &[]);
        assert!(left.equivalent(&right));
        assert!(!left.equivalent(&rules(&["a/*"], &[])));
    }

    #[test]
    fn serialization_omits_empty_exceptions() {
        let set = rules(&["a/*"], &[]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "subsets": ["a/*"] }));

        let restored: AccessRuleSet = serde_json::from_str(r#"{"subsets":["x"]}"#).unwrap();
        assert_eq!(restored.subsets, vec!["x"]);
        assert!(restored.exceptions.is_empty());
    }
}
