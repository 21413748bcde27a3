// identifiers.rs: Ordered identifier sets (scope names, endpoint ids).
//
// Identifier sets arrive either as a single space-delimited string (the
// OAuth-style `scope` parameter) or as an explicit list. Each shape has
// its own constructor.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used by the delimited form.
pub const DELIMITER: char = ' ';

/// A set of identifiers with deterministic (sorted) iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifiers(BTreeSet<String>);

impl Identifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-delimited string. Empty tokens are skipped.
    pub fn from_delimited(input: &str) -> Self {
        input
            .split(DELIMITER)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Build from an explicit list of identifiers.
    pub fn from_list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self(items.into_iter().map(Into::<String>::into).collect())
    }

    /// Add an identifier. Returns false if it was already present.
    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        self.0.insert(item.into())
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.contains(item)
    }

    /// True if at least one identifier of `other` is in this set.
    pub fn has_one_of(&self, other: &Identifiers) -> bool {
        other.0.iter().any(|item| self.0.contains(item))
    }

    /// True if every identifier of `other` is in this set.
    pub fn contains_all(&self, other: &Identifiers) -> bool {
        other.0.is_subset(&self.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for Identifiers {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders the delimited form, e.g. `"orders.read orders.write"`.
impl fmt::Display for Identifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.0 {
            if !first {
                write!(f, "{}", DELIMITER)?;
            }
            write!(f, "{}", item)?;
            first = false;
        }
        Ok(())
    }
}
