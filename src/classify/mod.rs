//! Tag-driven geometry classification of ways.
//!
//! A single tag is mapped to a [`TagCategory`] by consulting the rule sets in
//! [`PRIORITY`] order. The categories of a way's tags are then folded into
//! one [`GeometryVerdict`].

mod verdict;

pub use verdict::{Classification, GeometryVerdict, TagCategory};

use crate::rules::{MatcherSet, RuleKind};

/// Rule sets in the order they are consulted; the first match decides.
///
/// Polygon rules come before linestring rules, so a tag present in both
/// counts as a polygon indicator.
pub const PRIORITY: [(RuleKind, TagCategory); 5] = [
    (RuleKind::Polygon, TagCategory::PolygonIndicator),
    (RuleKind::Linestring, TagCategory::LineIndicator),
    (RuleKind::Meta, TagCategory::Neutral),
    (RuleKind::Neutral, TagCategory::Neutral),
    (RuleKind::Import, TagCategory::Neutral),
];

/// Key whose value overrides every other tag of the way.
pub const AREA_KEY: &str = "area";

pub fn classify_tag(matchers: &MatcherSet, key: &str, value: &str) -> TagCategory {
    PRIORITY
        .iter()
        .find(|(kind, _)| matchers.get(*kind).matches(key, value))
        .map(|(_, category)| *category)
        .unwrap_or(TagCategory::Unknown)
}

/// Fold the tags of one way into a verdict.
///
/// Keys that no rule set recognizes are collected in order of appearance
/// until the fold stops. The fold stops early on an `area` tag and on
/// reaching [`GeometryVerdict::Both`].
pub fn classify_way<'a, I>(matchers: &MatcherSet, tags: I) -> Classification
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut state = GeometryVerdict::Unclassified;
    let mut unknown_keys = Vec::new();

    for (key, value) in tags {
        if key == AREA_KEY {
            let verdict = match value {
                "yes" => GeometryVerdict::Polygon,
                "no" => GeometryVerdict::Linestring,
                _ => GeometryVerdict::Error,
            };
            tracing::trace!("  {} -> {}={} [area] -> {}", state, key, value, verdict);
            return Classification {
                verdict,
                unknown_keys,
            };
        }

        let category = classify_tag(matchers, key, value);
        if category == TagCategory::Unknown {
            unknown_keys.push(key.to_string());
        }

        let next = state.next(category);
        tracing::trace!("  {} -> {}={} [{}]", state, key, value, category);
        state = next;

        if state.is_terminal() {
            break;
        }
    }

    tracing::trace!("  -> {}", state);
    Classification {
        verdict: state,
        unknown_keys,
    }
}
