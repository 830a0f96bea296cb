//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → decoration filter (crate::decoration)
//!     → app handler
//!         → pages.rs (static pages by exact path)
//!         → upstream.rs (forward everything else, if configured)
//!     → decorated or original response to client
//! ```

pub mod pages;
pub mod request;
pub mod server;
pub mod upstream;

pub use pages::{StaticPage, StaticPages};
pub use request::{request_id, X_REQUEST_ID};
pub use server::{HttpServer, StartupError};
pub use upstream::Upstream;
