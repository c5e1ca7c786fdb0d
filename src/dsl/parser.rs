//! Parser for rule expressions.
//!
//! Grammar (in rough EBNF):
//!
//! line       = expression? comment?
//! comment    = "#" ANY*            (at line start or after whitespace)
//! expression = pattern (operator pattern)?
//! operator   = "!=" | "="
//! pattern    = "*" | "*"? TEXT "*"? | TEXT ("," TEXT)*

use super::ast::{StringPattern, TagExpr};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::take_while;

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Key text runs up to the operator.
fn key_text<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(1.., |c: char| c != '=' && c != '!').parse_next(input)
}

/// `true` for `!=`, `false` for `=`.
fn operator(input: &mut &str) -> PResult<bool> {
    alt(("!=".value(true), "=".value(false))).parse_next(input)
}

/// Values may contain anything, including `=`.
fn value_text<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(1.., |_: char| true).parse_next(input)
}

/// Raw key text, and the operator and value text if present.
type RawExpr<'s> = (&'s str, Option<(bool, &'s str)>);

fn tag_expr<'s>(input: &mut &'s str) -> PResult<RawExpr<'s>> {
    let key = key_text.parse_next(input)?;
    let Some(negated) = opt(operator).parse_next(input)? else {
        return Ok((key, None));
    };
    let value = value_text.parse_next(input)?;
    Ok((key, Some((negated, value))))
}

/// Strip the comment and surrounding whitespace from a rule line.
///
/// A `#` starts a comment at the beginning of a line or after whitespace,
/// so values such as `colour=#ff0000` stay intact.
pub fn strip_line(line: &str) -> &str {
    let comment = line.char_indices().find(|&(idx, c)| {
        c == '#' && line[..idx].chars().next_back().is_none_or(char::is_whitespace)
    });
    match comment {
        Some((idx, _)) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Parse one rule line. Returns `Ok(None)` for blank and comment-only lines.
pub fn parse_expression(line: &str) -> Result<Option<TagExpr>, String> {
    let mut input = strip_line(line);
    if input.is_empty() {
        return Ok(None);
    }
    let text = input;

    let (key, value) = tag_expr
        .parse_next(&mut input)
        .map_err(|e| format!("Invalid expression '{}': {:?}", text, e))?;

    if !input.is_empty() {
        return Err(format!(
            "Unexpected trailing input '{}' in expression '{}'",
            input, text
        ));
    }

    let pattern = |part: &str| {
        StringPattern::from_text(part).map_err(|e| format!("Invalid expression '{}': {}", text, e))
    };
    let (value, negated) = match value {
        Some((negated, value)) => (pattern(value)?, negated),
        None => (StringPattern::Any, false),
    };

    Ok(Some(TagExpr {
        key: pattern(key)?,
        value,
        negated,
    }))
}
