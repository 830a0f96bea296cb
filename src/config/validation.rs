//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (bindings reference known templates)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject malformed path patterns and templates
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::{uri::Authority, StatusCode};
use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::routing::{PathPattern, PatternError};
use crate::template::{CompiledTemplate, TemplateError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("decoration.mime_types must not be empty")]
    NoMimeTypes,

    #[error("invalid pattern in {field}: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: PatternError,
    },

    #[error("binding '{path}' has an empty decorator id")]
    EmptyDecorator { path: String },

    #[error("binding '{path}' uses decorator '{decorator}', which is not defined in templates.inline and no templates.directory is set")]
    UnknownDecorator { path: String, decorator: String },

    #[error("inline template is invalid: {0}")]
    Template(#[source] TemplateError),

    #[error("page path '{0}' must start with '/'")]
    PagePath(String),

    #[error("page '{0}' is defined more than once")]
    DuplicatePage(String),

    #[error("page '{path}' has invalid status {status}")]
    PageStatus { path: String, status: u16 },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }

    let decoration = &config.decoration;
    if decoration.mime_types.iter().all(|m| m.trim().is_empty()) {
        errors.push(ValidationError::NoMimeTypes);
    }
    if decoration.max_buffer_bytes == 0 {
        errors.push(ValidationError::Zero("decoration.max_buffer_bytes"));
    }
    for pattern in &decoration.excluded_paths {
        if let Err(source) = PathPattern::parse(pattern) {
            errors.push(ValidationError::Pattern {
                field: "decoration.excluded_paths",
                source,
            });
        }
    }
    for binding in &decoration.bindings {
        if let Err(source) = PathPattern::parse(&binding.path) {
            errors.push(ValidationError::Pattern {
                field: "decoration.bindings",
                source,
            });
        }
        if binding.decorator.trim().is_empty() {
            errors.push(ValidationError::EmptyDecorator {
                path: binding.path.clone(),
            });
        } else if config.templates.directory.is_none()
            && !config.templates.inline.contains_key(&binding.decorator)
        {
            errors.push(ValidationError::UnknownDecorator {
                path: binding.path.clone(),
                decorator: binding.decorator.clone(),
            });
        }
    }

    for (id, source) in &config.templates.inline {
        if let Err(e) = CompiledTemplate::compile(id, source) {
            errors.push(ValidationError::Template(e));
        }
    }

    let mut seen = HashSet::new();
    for page in &config.pages {
        if !page.path.starts_with('/') {
            errors.push(ValidationError::PagePath(page.path.clone()));
        }
        if !seen.insert(page.path.as_str()) {
            errors.push(ValidationError::DuplicatePage(page.path.clone()));
        }
        if StatusCode::from_u16(page.status).is_err() {
            errors.push(ValidationError::PageStatus {
                path: page.path.clone(),
                status: page.status,
            });
        }
    }

    if let Some(upstream) = &config.upstream {
        if Authority::from_str(&upstream.address).is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "upstream.address",
                value: upstream.address.clone(),
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BindingConfig, PageConfig, UpstreamConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not an address".into();
        config.timeouts.request_secs = 0;
        config.decoration.mime_types.clear();
        config.decoration.bindings.push(BindingConfig {
            path: "no-slash".into(),
            decorator: "main".into(),
        });
        config.templates.inline.insert("bad".into(), "${".into());
        config.pages.push(PageConfig {
            path: "/a".into(),
            content_type: "text/html".into(),
            status: 42,
            body: String::new(),
        });
        config.upstream = Some(UpstreamConfig {
            address: "bad address/with path".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        // address, timeout, mime types, pattern, unknown decorator, template, status, upstream
        assert_eq!(errors.len(), 8, "{errors:?}");
    }

    #[test]
    fn test_directory_allows_any_decorator() {
        let mut config = ServerConfig::default();
        config.templates.directory = Some("decorators".into());
        config.decoration.bindings.push(BindingConfig {
            path: "/*".into(),
            decorator: "main.html".into(),
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_pages() {
        let mut config = ServerConfig::default();
        for _ in 0..2 {
            config.pages.push(PageConfig {
                path: "/same".into(),
                content_type: "text/html".into(),
                status: 200,
                body: String::new(),
            });
        }
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::DuplicatePage(p)] if p == "/same"));
    }
}
