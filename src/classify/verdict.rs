use serde::Serialize;
use std::fmt;

/// What a single tag says about the geometry of its way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCategory {
    Unknown,
    LineIndicator,
    PolygonIndicator,
    Neutral,
}

impl TagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Unknown => "unknown",
            TagCategory::LineIndicator => "linestring",
            TagCategory::PolygonIndicator => "polygon",
            TagCategory::Neutral => "neutral",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a whole way; also the state of the tag fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryVerdict {
    Unclassified,
    Unknown,
    Linestring,
    Polygon,
    Both,
    // Never produced by the fold; ways with this verdict are dropped.
    #[allow(dead_code)]
    Neutral,
    Error,
}

impl GeometryVerdict {
    /// Transition on one classified tag.
    ///
    /// | current      | polygon | linestring | unknown |
    /// |--------------|---------|------------|---------|
    /// | unclassified | polygon | linestring | unknown |
    /// | linestring   | both    | linestring | unknown |
    /// | polygon      | polygon | both       | unknown |
    /// | unknown      | unknown | unknown    | unknown |
    ///
    /// Neutral tags never change the state; terminal states never change.
    pub fn next(self, category: TagCategory) -> Self {
        use GeometryVerdict as V;
        use TagCategory as C;

        match (self, category) {
            (state, C::Neutral) => state,
            (V::Unclassified, C::PolygonIndicator) => V::Polygon,
            (V::Unclassified, C::LineIndicator) => V::Linestring,
            (V::Linestring, C::PolygonIndicator) => V::Both,
            (V::Linestring, C::LineIndicator) => V::Linestring,
            (V::Polygon, C::PolygonIndicator) => V::Polygon,
            (V::Polygon, C::LineIndicator) => V::Both,
            (V::Unclassified | V::Linestring | V::Polygon | V::Unknown, _) => V::Unknown,
            (state @ (V::Both | V::Error | V::Neutral), _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GeometryVerdict::Both | GeometryVerdict::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryVerdict::Unclassified => "unclassified",
            GeometryVerdict::Unknown => "unknown",
            GeometryVerdict::Linestring => "linestring",
            GeometryVerdict::Polygon => "polygon",
            GeometryVerdict::Both => "both",
            GeometryVerdict::Neutral => "neutral",
            GeometryVerdict::Error => "error",
        }
    }
}

impl fmt::Display for GeometryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of folding the tags of one way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: GeometryVerdict,
    /// Keys no rule set recognized, up to the point the fold stopped.
    pub unknown_keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use GeometryVerdict as V;
        use TagCategory as C;

        let cases = [
            (V::Unclassified, C::PolygonIndicator, V::Polygon),
            (V::Unclassified, C::LineIndicator, V::Linestring),
            (V::Unclassified, C::Unknown, V::Unknown),
            (V::Linestring, C::PolygonIndicator, V::Both),
            (V::Linestring, C::LineIndicator, V::Linestring),
            (V::Linestring, C::Unknown, V::Unknown),
            (V::Polygon, C::PolygonIndicator, V::Polygon),
            (V::Polygon, C::LineIndicator, V::Both),
            (V::Polygon, C::Unknown, V::Unknown),
            (V::Unknown, C::PolygonIndicator, V::Unknown),
            (V::Unknown, C::LineIndicator, V::Unknown),
            (V::Unknown, C::Unknown, V::Unknown),
        ];

        for (state, category, expected) in cases {
            assert_eq!(state.next(category), expected, "{state} x {category}");
        }
    }

    #[test]
    fn neutral_never_changes_state() {
        for state in [
            GeometryVerdict::Unclassified,
            GeometryVerdict::Unknown,
            GeometryVerdict::Linestring,
            GeometryVerdict::Polygon,
        ] {
            assert_eq!(state.next(TagCategory::Neutral), state);
        }
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for state in [GeometryVerdict::Both, GeometryVerdict::Error] {
            assert!(state.is_terminal());
            for category in [
                TagCategory::Unknown,
                TagCategory::LineIndicator,
                TagCategory::PolygonIndicator,
            ] {
                assert_eq!(state.next(category), state);
            }
        }
        assert!(!GeometryVerdict::Polygon.is_terminal());
    }

    #[test]
    fn formats_lowercase_names() {
        assert_eq!(GeometryVerdict::Unclassified.to_string(), "unclassified");
        assert_eq!(GeometryVerdict::Both.to_string(), "both");
        assert_eq!(
            serde_json::to_string(&GeometryVerdict::Linestring).unwrap(),
            "\"linestring\""
        );
    }
}
