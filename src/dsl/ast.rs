//! AST types for rule expressions.

use std::fmt;

/// A pattern applied to either side of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPattern {
    /// `*`
    Any,
    /// `primary`
    Exact(String),
    /// `primary,secondary,tertiary`
    OneOf(Vec<String>),
    /// `addr:*`
    Prefix(String),
    /// `*_link`
    Suffix(String),
    /// `*ref*`
    Substring(String),
}

/// One rule line: a key pattern, a value pattern and an optional negation
/// of the value match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpr {
    pub key: StringPattern,
    pub value: StringPattern,
    pub negated: bool,
}

impl StringPattern {
    /// Classify raw pattern text by its wildcards.
    ///
    /// Surrounding whitespace is ignored, also around list items. A
    /// wildcard cannot be combined with a value list.
    pub fn from_text(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty pattern".to_string());
        }
        if text == "*" {
            return Ok(StringPattern::Any);
        }
        if text.contains(',') {
            if text.contains('*') {
                return Err(format!("wildcard in value list '{text}'"));
            }
            let items: Vec<String> = text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            return match items.len() {
                0 => Err(format!("empty value list '{text}'")),
                1 => Ok(StringPattern::Exact(items[0].clone())),
                _ => Ok(StringPattern::OneOf(items)),
            };
        }

        let starts_star = text.starts_with('*');
        let ends_star = text.len() > 1 && text.ends_with('*');
        Ok(match (starts_star, ends_star) {
            (true, true) => StringPattern::Substring(text[1..text.len() - 1].to_string()),
            (true, false) => StringPattern::Suffix(text[1..].to_string()),
            (false, true) => StringPattern::Prefix(text[..text.len() - 1].to_string()),
            (false, false) => StringPattern::Exact(text.to_string()),
        })
    }
}

impl fmt::Display for StringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringPattern::Any => write!(f, "*"),
            StringPattern::Exact(s) => write!(f, "{s}"),
            StringPattern::OneOf(items) => write!(f, "{}", items.join(",")),
            StringPattern::Prefix(s) => write!(f, "{s}*"),
            StringPattern::Suffix(s) => write!(f, "*{s}"),
            StringPattern::Substring(s) => write!(f, "*{s}*"),
        }
    }
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.negated) {
            (StringPattern::Any, false) => write!(f, "{}", self.key),
            (value, false) => write!(f, "{}={}", self.key, value),
            (value, true) => write!(f, "{}!={}", self.key, value),
        }
    }
}
