//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse binding patterns (`/hello`, `/news/*/view`, `/docs/*`, `*.html`, `/*`)
//! - Match a request path against a parsed pattern
//! - Rank patterns by specificity
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A trailing `*` segment is a catch-all; an inner `*` matches one segment
//! - No regex to guarantee O(n) matching

use thiserror::Error;

/// Reasons a pattern string is rejected at configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern is empty")]
    Empty,

    #[error("path pattern '{0}' must start with '/' or '*.'")]
    NotAbsolute(String),

    #[error("path pattern '{0}' contains '**'")]
    DoubleWildcard(String),

    #[error("path pattern '{0}' mixes '*' with other characters inside a segment")]
    EmbeddedWildcard(String),

    #[error("path pattern '{0}' has a wildcard before its trailing catch-all")]
    WildcardBeforeCatchAll(String),

    #[error("extension pattern '{0}' is malformed")]
    BadExtension(String),
}

/// One segment of a wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Any,
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `/hello`
    Exact(String),
    /// `/news/*/view`
    Wildcard(Vec<Segment>),
    /// `/docs/*`, stored without the trailing `/*`
    Prefix(String),
    /// `*.html`, stored without the leading `*.`
    Extension(String),
    /// `/*`
    CatchAll,
}

impl PathPattern {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if pattern.contains("**") {
            return Err(PatternError::DoubleWildcard(pattern.to_string()));
        }

        if let Some(ext) = pattern.strip_prefix("*.") {
            if ext.is_empty() || ext.contains(['/', '*', '.']) {
                return Err(PatternError::BadExtension(pattern.to_string()));
            }
            return Ok(PathPattern::Extension(ext.to_string()));
        }

        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }
        if pattern == "/*" {
            return Ok(PathPattern::CatchAll);
        }

        let segments: Vec<&str> = pattern[1..].split('/').collect();
        if segments.iter().any(|s| s.contains('*') && *s != "*") {
            return Err(PatternError::EmbeddedWildcard(pattern.to_string()));
        }

        if let Some((last, init)) = segments.split_last() {
            if *last == "*" {
                if init.contains(&"*") {
                    return Err(PatternError::WildcardBeforeCatchAll(pattern.to_string()));
                }
                let prefix = &pattern[..pattern.len() - 2];
                return Ok(PathPattern::Prefix(prefix.to_string()));
            }
        }

        if segments.contains(&"*") {
            let parsed = segments
                .into_iter()
                .map(|s| match s {
                    "*" => Segment::Any,
                    literal => Segment::Literal(literal.to_string()),
                })
                .collect();
            return Ok(PathPattern::Wildcard(parsed));
        }

        Ok(PathPattern::Exact(pattern.to_string()))
    }

    /// Returns true if the request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Wildcard(segments) => {
                let Some(rest) = path.strip_prefix('/') else {
                    return false;
                };
                let parts: Vec<&str> = rest.split('/').collect();
                parts.len() == segments.len()
                    && segments.iter().zip(parts).all(|(segment, part)| match segment {
                        Segment::Any => !part.is_empty(),
                        Segment::Literal(literal) => literal == part,
                    })
            }
            PathPattern::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PathPattern::Extension(ext) => {
                let last = path.rsplit('/').next().unwrap_or_default();
                last.len() > ext.len() + 1
                    && last
                        .strip_suffix(ext.as_str())
                        .is_some_and(|stem| stem.ends_with('.'))
            }
            PathPattern::CatchAll => true,
        }
    }

    /// Specificity key; larger sorts first.
    ///
    /// Order: exact, inner wildcards (more literals, then later first
    /// wildcard), prefix catch-alls (longer prefix), extensions, `/*`.
    pub fn specificity(&self) -> (u8, usize, usize) {
        match self {
            PathPattern::Exact(path) => (4, path.len(), 0),
            PathPattern::Wildcard(segments) => {
                let literals = segments
                    .iter()
                    .filter(|s| matches!(s, Segment::Literal(_)))
                    .count();
                let first_any = segments
                    .iter()
                    .position(|s| *s == Segment::Any)
                    .unwrap_or(segments.len());
                (3, literals, first_any)
            }
            PathPattern::Prefix(prefix) => (2, prefix.split('/').count(), 0),
            PathPattern::Extension(_) => (1, 0, 0),
            PathPattern::CatchAll => (0, 0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(PathPattern::parse("/hello").unwrap(), PathPattern::Exact("/hello".into()));
        assert_eq!(PathPattern::parse("/*").unwrap(), PathPattern::CatchAll);
        assert_eq!(PathPattern::parse("/docs/*").unwrap(), PathPattern::Prefix("/docs".into()));
        assert_eq!(PathPattern::parse("*.html").unwrap(), PathPattern::Extension("html".into()));
        assert!(matches!(PathPattern::parse("/a/*/b").unwrap(), PathPattern::Wildcard(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PathPattern::parse(""), Err(PatternError::Empty));
        assert!(matches!(PathPattern::parse("hello"), Err(PatternError::NotAbsolute(_))));
        assert!(matches!(PathPattern::parse("/a/**"), Err(PatternError::DoubleWildcard(_))));
        assert!(matches!(PathPattern::parse("/a*b"), Err(PatternError::EmbeddedWildcard(_))));
        assert!(matches!(PathPattern::parse("/*/x/*"), Err(PatternError::WildcardBeforeCatchAll(_))));
        assert!(matches!(PathPattern::parse("*."), Err(PatternError::BadExtension(_))));
    }

    #[test]
    fn test_exact_matcher() {
        let pattern = PathPattern::parse("/hello").unwrap();
        assert!(pattern.matches("/hello"));
        assert!(!pattern.matches("/hello/"));
        assert!(!pattern.matches("/HELLO"));
    }

    #[test]
    fn test_wildcard_matcher() {
        let pattern = PathPattern::parse("/news/*/view").unwrap();
        assert!(pattern.matches("/news/42/view"));
        assert!(!pattern.matches("/news//view"));
        assert!(!pattern.matches("/news/42/43/view"));
        assert!(!pattern.matches("/news/42/edit"));
    }

    #[test]
    fn test_prefix_matcher() {
        let pattern = PathPattern::parse("/docs/*").unwrap();
        assert!(pattern.matches("/docs"));
        assert!(pattern.matches("/docs/"));
        assert!(pattern.matches("/docs/a/b/c"));
        assert!(!pattern.matches("/docsearch"));
    }

    #[test]
    fn test_extension_matcher() {
        let pattern = PathPattern::parse("*.html").unwrap();
        assert!(pattern.matches("/a/b/index.html"));
        assert!(!pattern.matches("/a/.html"));
        assert!(!pattern.matches("/index.htm"));
        assert!(!pattern.matches("/html.txt"));
    }

    #[test]
    fn test_specificity_order() {
        let mut patterns: Vec<PathPattern> = ["/*", "*.html", "/a/*", "/a/b/*", "/a/*/c", "/*/b/c", "/a/b/c"]
            .iter()
            .map(|p| PathPattern::parse(p).unwrap())
            .collect();
        patterns.sort_by_key(|p| std::cmp::Reverse(p.specificity()));

        let expected: Vec<PathPattern> = ["/a/b/c", "/a/*/c", "/*/b/c", "/a/b/*", "/a/*", "*.html", "/*"]
            .iter()
            .map(|p| PathPattern::parse(p).unwrap())
            .collect();
        assert_eq!(patterns, expected);
    }
}
