//! Decides whether a response is decorated, and with which decorator.
//!
//! # Responsibilities
//! - MIME type predicate (charset and other parameters ignored)
//! - Status and encoding filters
//! - Excluded paths
//! - Binding lookup for the request path
//!
//! # Design Decisions
//! - Pure: no I/O, no mutable state
//! - "No decoration" is a value (`Decision::Passthrough`), not an error

use axum::http::{header, HeaderMap, StatusCode};

use crate::config::DecorationConfig;
use crate::routing::{BindingTable, PathSet, PatternError};

/// Why a response was passed through without decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDecorated,
    Method,
    Status,
    Encoded,
    ContentType,
    Excluded,
    NoBinding,
    TooLarge,
    BodyError,
    PageOptOut,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyDecorated => "already_decorated",
            SkipReason::Method => "method",
            SkipReason::Status => "status",
            SkipReason::Encoded => "encoded",
            SkipReason::ContentType => "content_type",
            SkipReason::Excluded => "excluded",
            SkipReason::NoBinding => "no_binding",
            SkipReason::TooLarge => "too_large",
            SkipReason::BodyError => "body_error",
            SkipReason::PageOptOut => "page_opt_out",
        }
    }
}

/// Outcome of selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Decorate(String),
    Passthrough(SkipReason),
}

/// MIME type essence: the part before `;`, trimmed and lowercased.
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Matches content types against configured MIME types (`text/html`, `text/*`).
#[derive(Debug, Clone)]
pub struct MimePredicate {
    accepted: Vec<String>,
}

impl MimePredicate {
    pub fn new<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            accepted: types.iter().map(|t| mime_essence(t.as_ref())).collect(),
        }
    }

    pub fn matches(&self, content_type: &str) -> bool {
        let essence = mime_essence(content_type);
        self.accepted.iter().any(|accepted| match accepted.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') => essence.starts_with(prefix),
            _ => *accepted == essence,
        })
    }
}

/// Path- and content-type-based decorator selector.
#[derive(Debug, Clone)]
pub struct Selector {
    mime: MimePredicate,
    bindings: BindingTable,
    excluded: PathSet,
    include_error_pages: bool,
}

impl Selector {
    pub fn new(mime: MimePredicate, bindings: BindingTable) -> Self {
        Self {
            mime,
            bindings,
            excluded: PathSet::default(),
            include_error_pages: false,
        }
    }

    pub fn with_excluded(mut self, excluded: PathSet) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn include_error_pages(mut self, include: bool) -> Self {
        self.include_error_pages = include;
        self
    }

    pub fn from_config(config: &DecorationConfig) -> Result<Self, PatternError> {
        let mut bindings = BindingTable::new();
        for binding in &config.bindings {
            bindings = bindings.put(&binding.path, binding.decorator.clone())?;
        }
        Ok(Self::new(MimePredicate::new(&config.mime_types), bindings)
            .with_excluded(PathSet::from_patterns(&config.excluded_paths)?)
            .include_error_pages(config.include_error_pages))
    }

    /// Decorator id for a content type and path, or `None` for passthrough.
    pub fn select(&self, content_type: &str, path: &str) -> Option<&str> {
        match self.route(content_type, path) {
            Ok(decorator) => Some(decorator),
            Err(_) => None,
        }
    }

    fn route(&self, content_type: &str, path: &str) -> Result<&str, SkipReason> {
        if !self.mime.matches(content_type) {
            return Err(SkipReason::ContentType);
        }
        if self.excluded.contains(path) {
            return Err(SkipReason::Excluded);
        }
        self.bindings
            .lookup(path)
            .map(|binding| binding.decorator.as_str())
            .ok_or(SkipReason::NoBinding)
    }

    /// Full decision for a finished response.
    pub fn decide(&self, path: &str, status: StatusCode, headers: &HeaderMap) -> Decision {
        let status_ok = status == StatusCode::OK
            || (self.include_error_pages && (status.is_client_error() || status.is_server_error()));
        if !status_ok {
            return Decision::Passthrough(SkipReason::Status);
        }

        let encoded = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !v.trim().eq_ignore_ascii_case("identity"));
        if encoded {
            return Decision::Passthrough(SkipReason::Encoded);
        }

        let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return Decision::Passthrough(SkipReason::ContentType);
        };

        match self.route(content_type, path) {
            Ok(decorator) => Decision::Decorate(decorator.to_string()),
            Err(reason) => Decision::Passthrough(reason),
        }
    }
}
