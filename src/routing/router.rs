//! Decorator binding lookup.
//!
//! # Responsibilities
//! - Store compiled `(pattern, decorator)` bindings
//! - Look up the winning binding for a request path
//! - Return the matched binding or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in specificity order (acceptable for typical binding counts)
//! - Explicit `None` rather than silent default

use std::cmp::Reverse;

use crate::routing::matcher::{PathPattern, PatternError};

/// A path pattern bound to a decorator identifier.
#[derive(Debug, Clone)]
pub struct DecoratorBinding {
    /// The pattern as written in configuration.
    pub source: String,
    pattern: PathPattern,
    /// Template identifier passed to the template engine.
    pub decorator: String,
}

impl DecoratorBinding {
    pub fn new(pattern: &str, decorator: impl Into<String>) -> Result<Self, PatternError> {
        Ok(Self {
            source: pattern.to_string(),
            pattern: PathPattern::parse(pattern)?,
            decorator: decorator.into(),
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// Ordered binding table. The most specific matching binding wins.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: Vec<DecoratorBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Re-sorts by specificity; equal ranks keep insertion order.
    pub fn put(mut self, pattern: &str, decorator: impl Into<String>) -> Result<Self, PatternError> {
        self.bindings.push(DecoratorBinding::new(pattern, decorator)?);
        self.bindings
            .sort_by_key(|b| Reverse(b.pattern.specificity()));
        Ok(self)
    }

    /// Find the decorator binding for a request path.
    pub fn lookup(&self, path: &str) -> Option<&DecoratorBinding> {
        self.bindings.iter().find(|b| b.matches(path))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &DecoratorBinding> {
        self.bindings.iter()
    }
}

/// A set of patterns with OR semantics, used for excluded paths.
#[derive(Debug, Clone, Default)]
pub struct PathSet {
    patterns: Vec<PathPattern>,
}

impl PathSet {
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_beats_catch_all() {
        let table = BindingTable::new()
            .put("/*", "default")
            .unwrap()
            .put("/hello", "special")
            .unwrap();

        assert_eq!(table.lookup("/hello").unwrap().decorator, "special");
        assert_eq!(table.lookup("/bye").unwrap().decorator, "default");
    }

    #[test]
    fn test_longer_prefix_wins() {
        let table = BindingTable::new()
            .put("/docs/*", "docs")
            .unwrap()
            .put("/docs/api/*", "api")
            .unwrap()
            .put("*.html", "html")
            .unwrap();

        assert_eq!(table.lookup("/docs/api/v1").unwrap().decorator, "api");
        assert_eq!(table.lookup("/docs/guide").unwrap().decorator, "docs");
        assert_eq!(table.lookup("/docs/guide.html").unwrap().decorator, "docs");
        assert_eq!(table.lookup("/blog/post.html").unwrap().decorator, "html");
        assert!(table.lookup("/blog/post").is_none());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let table = BindingTable::new()
            .put("/a/*/c", "first")
            .unwrap()
            .put("/a/*/c", "second")
            .unwrap();

        assert_eq!(table.lookup("/a/b/c").unwrap().decorator, "first");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(BindingTable::new().put("nope", "x").is_err());
    }

    #[test]
    fn test_path_set() {
        let set = PathSet::from_patterns(&["/admin/*", "*.txt"]).unwrap();
        assert!(set.contains("/admin/users"));
        assert!(set.contains("/robots.txt"));
        assert!(!set.contains("/index"));
    }
}
