//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Which responses are decorated, and with what.
    pub decoration: DecorationConfig,

    /// Where decorator templates come from.
    pub templates: TemplatesConfig,

    /// Static pages served by the built-in application.
    pub pages: Vec<PageConfig>,

    /// Upstream application that handles everything not in `pages`.
    pub upstream: Option<UpstreamConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for a single upstream exchange in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Decoration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DecorationConfig {
    /// Turn the filter off entirely.
    pub enabled: bool,

    /// Content types that are decorated (`text/html`, `text/*`).
    pub mime_types: Vec<String>,

    /// Also decorate 4xx/5xx responses.
    pub include_error_pages: bool,

    /// Let `<meta name="decorator">` pick (or disable) the decorator.
    pub honor_meta_decorator: bool,

    /// Largest body that will be buffered for decoration.
    pub max_buffer_bytes: usize,

    /// Paths that are never decorated.
    pub excluded_paths: Vec<String>,

    /// Path pattern → decorator bindings.
    pub bindings: Vec<BindingConfig>,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mime_types: vec!["text/html".to_string()],
            include_error_pages: false,
            honor_meta_decorator: true,
            max_buffer_bytes: 2 * 1024 * 1024, // 2MB
            excluded_paths: Vec::new(),
            bindings: Vec::new(),
        }
    }
}

/// A single `(path pattern, decorator)` binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindingConfig {
    /// Pattern such as `/*`, `/docs/*`, `/hello` or `*.html`.
    pub path: String,

    /// Template id handed to the template engine.
    pub decorator: String,
}

/// Template sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory holding decorator files; ids are paths relative to it.
    pub directory: Option<PathBuf>,

    /// Templates defined directly in the config, keyed by id.
    /// Checked before the directory.
    pub inline: BTreeMap<String, String>,
}

/// A static page served by the built-in application.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    /// Exact request path.
    pub path: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default = "default_status")]
    pub status: u16,

    pub body: String,
}

fn default_content_type() -> String {
    "text/html; charset=utf-8".to_string()
}

fn default_status() -> u16 {
    200
}

/// Upstream application server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "127.0.0.1:3000").
    pub address: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
