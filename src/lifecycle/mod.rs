//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pipeline → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger() → broadcast → server drains and exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
