//! Response decoration for HTML pages.
//!
//! Intercepts HTML responses, extracts title/head/body from the page and
//! renders them into a decorator template chosen by request path.

pub mod config;
pub mod content;
pub mod decoration;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod template;

pub use config::ServerConfig;
pub use decoration::{decoration_middleware, DecorationState, Pipeline};
pub use error::DecorationError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
