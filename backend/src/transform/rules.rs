//! Value transform rules applied to the join key before geometry lookup.
//!
//! A rule is a `(find, replace)` pair whose meaning depends on which side is
//! empty. Branches are tried in this order and the first match wins:
//!
//! | find      | replace    | effect                          |
//! |-----------|------------|---------------------------------|
//! | non-empty | `delete`   | remove every occurrence of find |
//! | non-empty | empty      | prepend find                    |
//! | empty     | non-empty  | append replace                  |
//! | non-empty | non-empty  | `find + value + replace`        |
//!
//! Rules run in sequence, each one seeing the previous rule's output.
//! A literal replacement text of `delete` cannot be expressed.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TransformRuleError;

/// Replacement text that turns a rule into a removal.
pub const DELETE_SENTINEL: &str = "delete";

/// One `(find, replace)` pair as entered by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransformRule {
    #[serde(default)]
    pub find: String,
    #[serde(default)]
    pub replace: String,
}

/// What a rule does once its two columns are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOp<'a> {
    Remove(&'a str),
    Prefix(&'a str),
    Suffix(&'a str),
    Wrap(&'a str, &'a str),
    Noop,
}

impl TransformRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }

    /// Parse a `FIND=REPLACE` argument. Only the first `=` splits.
    pub fn parse(arg: &str) -> Result<Self, TransformRuleError> {
        let (find, replace) = arg
            .split_once('=')
            .ok_or_else(|| TransformRuleError::InvalidRule(arg.to_string()))?;
        Ok(Self::new(find, replace))
    }

    /// Interpret the rule. Branch order matters.
    pub fn op(&self) -> TransformOp<'_> {
        let find = self.find.as_str();
        let replace = self.replace.as_str();
        if !find.is_empty() && replace == DELETE_SENTINEL {
            TransformOp::Remove(find)
        } else if !find.is_empty() && replace.is_empty() {
            TransformOp::Prefix(find)
        } else if find.is_empty() && !replace.is_empty() {
            TransformOp::Suffix(replace)
        } else if !find.is_empty() && !replace.is_empty() {
            TransformOp::Wrap(find, replace)
        } else {
            TransformOp::Noop
        }
    }

    /// Apply this rule to a value.
    pub fn apply(&self, value: &str) -> String {
        match self.op() {
            TransformOp::Remove(find) => value.replace(find, ""),
            TransformOp::Prefix(prefix) => format!("{}{}", prefix, value),
            TransformOp::Suffix(suffix) => format!("{}{}", value, suffix),
            TransformOp::Wrap(prefix, suffix) => format!("{}{}{}", prefix, value, suffix),
            TransformOp::Noop => value.to_string(),
        }
    }
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<TransformRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order over the value.
    pub fn apply(&self, value: &str) -> String {
        self.rules
            .iter()
            .fold(value.to_string(), |acc, rule| rule.apply(&acc))
    }

    /// Parse `FIND=REPLACE` arguments.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, TransformRuleError> {
        args.iter()
            .map(|a| TransformRule::parse(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Load rules from a CSV file with `find,replace` columns.
    pub fn from_csv_file(path: &Path) -> Result<Self, TransformRuleError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::None).from_path(path)?;
        let rules = reader
            .deserialize::<TransformRule>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Append rules from another set.
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }
}

/// Human-readable rule grammar for `statjoin rules`.
pub fn rules_description() -> String {
    r#"Join-key transform rules (applied in order, each to the previous result):

| find      | replace   | effect                                  |
|-----------|-----------|-----------------------------------------|
| non-empty | delete    | remove every occurrence of find         |
| non-empty | (empty)   | prepend find                            |
| (empty)   | non-empty | append replace                          |
| non-empty | non-empty | wrap: find + value + replace            |

The first matching row wins. A literal replacement of "delete" cannot be
expressed.

On the command line:   --rule 'SE=delete' --rule '=_01'
In a rules CSV file:   find,replace
                       SE,delete
                       ,_01"#
        .to_string()
}
