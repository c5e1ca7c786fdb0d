//! Rule set loading and matching.

use crate::dsl::{TagExpr, evaluate_expr, parse_expression};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rules: Failed to read {kind} rules from {path:?}")]
    Read {
        kind: RuleKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rules: {path:?} line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// The five rule sets the classifier consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Polygon,
    Linestring,
    Meta,
    Neutral,
    Import,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Polygon,
        RuleKind::Linestring,
        RuleKind::Meta,
        RuleKind::Neutral,
        RuleKind::Import,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Polygon => "polygon",
            RuleKind::Linestring => "linestring",
            RuleKind::Meta => "meta",
            RuleKind::Neutral => "neutral",
            RuleKind::Import => "import",
        }
    }

    /// File name looked up in the expressions directory unless configured otherwise.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            RuleKind::Polygon => "polygon-tags",
            RuleKind::Linestring => "linestring-tags",
            RuleKind::Meta => "meta-tags",
            RuleKind::Neutral => "neutral-tags",
            RuleKind::Import => "import-tags",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered list of expressions; a tag matches if any expression does.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    pub kind: RuleKind,
    pub exprs: Vec<TagExpr>,
}

impl TagMatcher {
    /// Parse rule text. `origin` is only used for error messages.
    pub fn parse(kind: RuleKind, source: &str, origin: &Path) -> Result<Self, RuleError> {
        let mut exprs = Vec::new();

        for (i, line) in source.lines().enumerate() {
            let parsed = parse_expression(line).map_err(|message| RuleError::Malformed {
                path: origin.to_path_buf(),
                line: i + 1,
                message,
            })?;
            if let Some(expr) = parsed {
                exprs.push(expr);
            }
        }

        Ok(TagMatcher { kind, exprs })
    }

    pub fn load(kind: RuleKind, path: &Path) -> Result<Self, RuleError> {
        let source = std::fs::read_to_string(path).map_err(|source| RuleError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
        let matcher = Self::parse(kind, &source, path)?;
        tracing::debug!(
            "Loaded {} {} rules from {:?}",
            matcher.exprs.len(),
            matcher.kind,
            path
        );
        Ok(matcher)
    }

    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.exprs
            .iter()
            .any(|expr| evaluate_expr(expr, key, value))
    }
}

/// All five rule sets. Loaded once, then shared read-only.
#[derive(Debug, Clone)]
pub struct MatcherSet {
    polygon: TagMatcher,
    linestring: TagMatcher,
    meta: TagMatcher,
    neutral: TagMatcher,
    import: TagMatcher,
}

impl MatcherSet {
    /// Load every rule set; `resolve` maps a kind to its file path.
    pub fn load<F>(resolve: F) -> Result<Self, RuleError>
    where
        F: Fn(RuleKind) -> PathBuf,
    {
        Ok(MatcherSet {
            polygon: TagMatcher::load(RuleKind::Polygon, &resolve(RuleKind::Polygon))?,
            linestring: TagMatcher::load(RuleKind::Linestring, &resolve(RuleKind::Linestring))?,
            meta: TagMatcher::load(RuleKind::Meta, &resolve(RuleKind::Meta))?,
            neutral: TagMatcher::load(RuleKind::Neutral, &resolve(RuleKind::Neutral))?,
            import: TagMatcher::load(RuleKind::Import, &resolve(RuleKind::Import))?,
        })
    }

    /// Build a set from rule text held in memory, in `RuleKind::ALL` order.
    #[cfg(test)]
    pub fn from_sources(sources: [&str; 5]) -> Result<Self, RuleError> {
        let [polygon, linestring, meta, neutral, import] = sources;
        let origin = Path::new("<memory>");
        Ok(MatcherSet {
            polygon: TagMatcher::parse(RuleKind::Polygon, polygon, origin)?,
            linestring: TagMatcher::parse(RuleKind::Linestring, linestring, origin)?,
            meta: TagMatcher::parse(RuleKind::Meta, meta, origin)?,
            neutral: TagMatcher::parse(RuleKind::Neutral, neutral, origin)?,
            import: TagMatcher::parse(RuleKind::Import, import, origin)?,
        })
    }

    pub fn get(&self, kind: RuleKind) -> &TagMatcher {
        match kind {
            RuleKind::Polygon => &self.polygon,
            RuleKind::Linestring => &self.linestring,
            RuleKind::Meta => &self.meta,
            RuleKind::Neutral => &self.neutral,
            RuleKind::Import => &self.import,
        }
    }

    pub fn expression_count(&self) -> usize {
        RuleKind::ALL
            .iter()
            .map(|kind| self.get(*kind).exprs.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_rule_file_skipping_comments() {
        let source = "# polygons\nbuilding\n\nlanduse=*  # any landuse\nbarrier!=no\n";
        let matcher = TagMatcher::parse(RuleKind::Polygon, source, Path::new("test")).unwrap();

        assert_eq!(matcher.exprs.len(), 3);
        assert!(matcher.matches("building", "yes"));
        assert!(matcher.matches("landuse", "forest"));
        assert!(matcher.matches("barrier", "wall"));
        assert!(!matcher.matches("barrier", "no"));
        assert!(!matcher.matches("highway", "primary"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let source = "building\nhighway=\n";
        let err = TagMatcher::parse(RuleKind::Linestring, source, Path::new("linestring-tags"))
            .unwrap_err();

        match &err {
            RuleError::Malformed { line, .. } => assert_eq!(*line, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn spaced_expressions_still_match() {
        let source = "highway = primary\nbarrier=fence, wall\n";
        let matcher = TagMatcher::parse(RuleKind::Linestring, source, Path::new("test")).unwrap();

        assert!(matcher.matches("highway", "primary"));
        assert!(matcher.matches("barrier", "wall"));
        assert!(!matcher.matches("barrier", " wall"));
    }

    #[test]
    fn wildcard_value_list_is_malformed() {
        let source = "building\nhighway=*_link,primary\n";
        let err = TagMatcher::parse(RuleKind::Linestring, source, Path::new("linestring-tags"))
            .unwrap_err();
        assert!(matches!(err, RuleError::Malformed { line: 2, .. }));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TagMatcher::load(RuleKind::Meta, &dir.path().join("meta-tags")).unwrap_err();
        assert!(matches!(err, RuleError::Read { kind: RuleKind::Meta, .. }));
        assert!(err.to_string().contains("meta"));
    }

    #[test]
    fn loads_all_sets_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for kind in RuleKind::ALL {
            let mut file = std::fs::File::create(dir.path().join(kind.default_file_name())).unwrap();
            writeln!(file, "{}_key", kind.label()).unwrap();
        }

        let set = MatcherSet::load(|kind| dir.path().join(kind.default_file_name())).unwrap();

        assert_eq!(set.expression_count(), 5);
        assert!(set.get(RuleKind::Import).matches("import_key", "x"));
        assert!(!set.get(RuleKind::Import).matches("meta_key", "x"));
    }

    #[test]
    fn empty_rule_file_matches_nothing() {
        let set = MatcherSet::from_sources(["", "", "", "", ""]).unwrap();
        for kind in RuleKind::ALL {
            assert!(!set.get(kind).matches("building", "yes"));
        }
    }
}
