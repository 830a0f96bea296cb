//! Decorator routing subsystem.
//!
//! # Data Flow
//! ```text
//! Response path
//!     → router.rs (binding lookup)
//!     → matcher.rs (evaluate path patterns)
//!     → Return: winning DecoratorBinding or NoMatch
//!
//! Table compilation (at startup):
//!     [[decoration.bindings]]
//!     → Parse patterns
//!     → Sort by specificity (stable)
//!     → Freeze as immutable BindingTable
//! ```
//!
//! # Design Decisions
//! - Bindings compiled at startup, immutable at runtime
//! - Ordered rule evaluation, no override chains
//! - Deterministic: same path always picks the same decorator

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{BindingTable, DecoratorBinding, PathSet};
