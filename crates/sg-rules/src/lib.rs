//! # sg-rules
//!
//! Wildcard access rules for Scopegate.
//!
//! An [`AccessRuleSet`] holds `subsets` (grants) and `exceptions`
//! (revocations) as glob-style rule strings, where `*` matches any run of
//! characters. [`AccessRuleSet::can_access`] is the local dry-run of the
//! authority's decision; [`remove_redundant`] keeps rule payloads minimal.
//!
//! ## Key invariants
//!
//! - **Exceptions win**: a path covered by an exception is denied even when
//!   a subset grants it.
//! - **Default deny**: an empty rule set grants nothing.
//! - **Stable reduction**: `remove_redundant` is idempotent, its membership
//!   is independent of input order, and it never narrows what a set grants.

pub mod error;
pub mod identifiers;
pub mod pattern;
pub mod rules;

pub use error::RuleError;
pub use identifiers::Identifiers;
pub use pattern::{is_covered, is_wildcard, remove_redundant, PatternMatcher, RulePattern, WILDCARD};
pub use rules::{AccessExplanation, AccessRuleSet};
