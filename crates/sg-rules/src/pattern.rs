// pattern.rs: Wildcard rule patterns and coverage queries.
//
// A rule is either a literal subset string ("users/42/posts") or contains
// one or more `*` tokens, each standing for any run of characters
// (including `/`). Wildcard rules compile to anchored regular expressions:
// literal runs are escaped, every `*` becomes `.*`.
//
// Examples:
//   "users/*"        → covers "users/42", "users/42/posts"
//   "users/*/posts"  → covers "users/42/posts", not "users/42"
//   "users/42"       → covers only "users/42"

use std::collections::HashSet;

use regex::Regex;

use crate::error::RuleError;

/// The wildcard token used in rule patterns.
pub const WILDCARD: char = '*';

/// True if the rule contains at least one wildcard token.
pub fn is_wildcard(rule: &str) -> bool {
    rule.contains(WILDCARD)
}

/// A single compiled rule pattern.
#[derive(Debug, Clone)]
pub struct RulePattern {
    source: String,
    regex: Regex,
}

impl RulePattern {
    /// Compile a rule string into an anchored matcher.
    pub fn compile(source: &str) -> Result<Self, RuleError> {
        let mut expr = String::with_capacity(source.len() + 8);
        expr.push_str("(?s)^");
        for (i, literal) in source.split(WILDCARD).enumerate() {
            if i > 0 {
                expr.push_str(".*");
            }
            expr.push_str(&regex::escape(literal));
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| RuleError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The rule text this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.source)
    }

    /// Check whether `value` is matched by this pattern.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Compile a rule, logging and skipping it if it cannot be compiled.
///
/// Skipped rules never match anything (fail-closed).
fn compile_or_skip(rule: &str) -> Option<RulePattern> {
    match RulePattern::compile(rule) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::warn!("skipping rule: {}", e);
            None
        }
    }
}

/// A pre-compiled rule collection answering coverage queries.
///
/// Literal rules are looked up by equality; wildcard rules are matched
/// in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    literals: HashSet<String>,
    patterns: Vec<RulePattern>,
}

impl PatternMatcher {
    /// Build a matcher from a set of rules.
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut literals = HashSet::new();
        let mut patterns = Vec::new();
        for rule in rules {
            let rule = rule.as_ref();
            if is_wildcard(rule) {
                patterns.extend(compile_or_skip(rule));
            } else {
                literals.insert(rule.to_string());
            }
        }
        Self { literals, patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }

    /// True if any rule (literal or wildcard) covers `value`.
    pub fn is_covered(&self, value: &str) -> bool {
        self.covering_rule(value).is_some()
    }

    /// Return the rule that covers `value`, if any.
    ///
    /// An exact literal match takes priority over wildcard matches.
    pub fn covering_rule(&self, value: &str) -> Option<&str> {
        if let Some(literal) = self.literals.get(value) {
            return Some(literal.as_str());
        }
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(value))
            .map(RulePattern::source)
    }
}

/// Check whether `value` is covered by any of `rules`.
pub fn is_covered<S: AsRef<str>>(value: &str, rules: &[S]) -> bool {
    if rules.is_empty() {
        return false;
    }
    PatternMatcher::new(rules).is_covered(value)
}

/// Drop rules already covered by a strictly more general wildcard rule,
/// then collapse duplicates.
///
/// Survivors keep their first-occurrence order. Which rules survive
/// depends only on the input multiset, and applying this twice yields the
/// same result as applying it once. Every dropped rule remains covered by
/// a surviving one, so the set of granted values never shrinks.
pub fn remove_redundant<S: AsRef<str>>(rules: &[S]) -> Vec<String> {
    let patterns: Vec<RulePattern> = rules
        .iter()
        .map(|rule| rule.as_ref())
        .filter(|rule| is_wildcard(rule))
        .filter_map(compile_or_skip)
        .collect();

    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for rule in rules {
        let rule = rule.as_ref();
        if seen.contains(rule) || is_strictly_covered(rule, &patterns) {
            continue;
        }
        seen.insert(rule.to_string());
        kept.push(rule.to_string());
    }
    kept
}

/// True if some other pattern in `patterns` is strictly more general than `rule`.
///
/// `general` beats `rule` when it matches `rule`'s text and either `rule` is
/// narrower (its own pattern cannot match `general`'s text) or the two are
/// mutually covering and `general` ranks first. The rank breaks ties between
/// equivalent spellings like `*` and `**`, so exactly one of them survives.
fn is_strictly_covered(rule: &str, patterns: &[RulePattern]) -> bool {
    let own = patterns.iter().find(|pattern| pattern.source() == rule);

    patterns.iter().any(|general| {
        if general.source() == rule || !general.matches(rule) {
            return false;
        }
        match own {
            None => true,
            Some(own) => !own.matches(general.source()) || rank(general.source()) < rank(rule),
        }
    })
}

fn rank(rule: &str) -> (usize, &str) {
    (rule.len(), rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut rules: Vec<String>) -> Vec<String> {
        rules.sort();
        rules
    }

    // ── Coverage ─────────────────────────────────────────────────

    #[test]
    fn wildcard_covers_single_segment() {
        assert!(is_covered("a/b", &["a/*"]));
    }

    #[test]
    fn different_literal_is_not_covered() {
        assert!(!is_covered("a/b", &["a/c"]));
    }

    #[test]
    fn literal_equality_covers() {
        assert!(is_covered("users/42", &["users/42"]));
    }

    #[test]
    fn wildcard_spans_remainder() {
        assert!(is_covered("users/42/posts/7", &["users/*"]));
        assert!(is_covered("users/42/posts", &["users/*/posts"]));
        assert!(!is_covered("users/42", &["users/*/posts"]));
    }

    #[test]
    fn empty_rule_list_covers_nothing() {
        let none: [&str; 0] = [];
        assert!(!is_covered("anything", &none));
    }

    #[test]
    fn pattern_is_anchored() {
        assert!(!is_covered("prefix/a/b", &["a/*"]));
        assert!(!is_covered("a/b", &["*/c"]));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(is_covered("files/a.txt", &["files/*.txt"]));
        assert!(!is_covered("files/abtxt", &["files/*.txt"]));
        assert!(!is_covered("x+y", &["x+*z"]));
        assert!(is_covered("(group)/1", &["(group)/*"]));
    }

    #[test]
    fn covering_rule_prefers_literal() {
        let matcher = PatternMatcher::new(["a/*", "a/b"]);
        assert_eq!(matcher.covering_rule("a/b"), Some("a/b"));
        assert_eq!(matcher.covering_rule("a/c"), Some("a/*"));
        assert_eq!(matcher.covering_rule("b/c"), None);
    }

    #[test]
    fn compiled_pattern_reports_source() {
        let pattern = RulePattern::compile("orgs/*/members").unwrap();
        assert_eq!(pattern.source(), "orgs/*/members");
        assert!(pattern.is_wildcard());
        assert!(pattern.matches("orgs/acme/members"));
    }

    // ── Redundancy elimination ───────────────────────────────────

    #[test]
    fn literal_under_wildcard_is_dropped() {
        assert_eq!(remove_redundant(&["a/*", "a/b"]), vec!["a/*"]);
    }

    #[test]
    fn unrelated_rules_survive() {
        assert_eq!(
            remove_redundant(&["a/b", "c/d", "e/*"]),
            vec!["a/b", "c/d", "e/*"]
        );
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(remove_redundant(&["a/b", "a/b", "x/*", "x/*"]), vec!["a/b", "x/*"]);
    }

    #[test]
    fn narrower_wildcard_is_dropped() {
        assert_eq!(
            remove_redundant(&["users/*/posts/*", "users/*"]),
            vec!["users/*"]
        );
    }

    #[test]
    fn equivalent_spellings_keep_exactly_one() {
        assert_eq!(remove_redundant(&["**", "*"]), vec!["*"]);
        assert_eq!(remove_redundant(&["*", "**"]), vec!["*"]);
        assert_eq!(remove_redundant(&["a/**", "a/*"]), vec!["a/*"]);
    }

    #[test]
    fn membership_is_order_independent() {
        let forward = vec!["a/*", "a/b", "b/c", "b/*/d", "b/x/d", "**", "c"];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(
            sorted(remove_redundant(&forward)),
            sorted(remove_redundant(&backward))
        );
    }

    #[test]
    fn reduction_is_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec![],
            vec!["a/b"],
            vec!["a/*", "a/b", "a/b/c"],
            vec!["*", "**", "***", "a"],
            vec!["x/*/y", "x/*", "x/1/y", "z/*/w", "z/2/*"],
            vec!["a*b", "a*", "*b", "ab"],
        ];
        for input in inputs {
            let once = remove_redundant(&input);
            let twice = remove_redundant(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn dropped_rules_stay_covered() {
        let input = vec!["a*b", "a*", "*b", "ab", "q/*/r", "q/1/r", "q/*"];
        let kept = remove_redundant(&input);
        for rule in &input {
            assert!(
                is_covered(rule, &kept),
                "'{}' lost coverage after reduction to {:?}",
                rule,
                kept
            );
        }
    }
}
