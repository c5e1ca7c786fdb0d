//! Evaluator for rule expressions.

use super::ast::{StringPattern, TagExpr};

impl StringPattern {
    /// Match a pattern against an actual key or value.
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            StringPattern::Any => true,
            StringPattern::Exact(expected) => actual == expected,
            StringPattern::OneOf(items) => items.iter().any(|item| item == actual),
            StringPattern::Prefix(prefix) => actual.starts_with(prefix.as_str()),
            StringPattern::Suffix(suffix) => actual.ends_with(suffix.as_str()),
            StringPattern::Substring(inner) => actual.contains(inner.as_str()),
        }
    }
}

/// Evaluate an expression against a single tag.
///
/// A negated expression still requires the key to match; only the value
/// test is inverted.
pub fn evaluate_expr(expr: &TagExpr, key: &str, value: &str) -> bool {
    expr.key.matches(key) && (expr.value.matches(value) != expr.negated)
}
