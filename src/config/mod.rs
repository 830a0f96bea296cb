//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → compiled into the binding table and template engines at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BindingConfig, DecorationConfig, ListenerConfig, LogFormat, ObservabilityConfig, PageConfig,
    ServerConfig, TemplatesConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
