//! Response decoration subsystem.
//!
//! # Data Flow
//! ```text
//! Application response
//!     → interceptor.rs (mark request, decide, buffer)
//!     → selector.rs (content type, status, path → decorator id)
//!     → content::extractor (title/head/body/extras)
//!     → applier.rs (render decorator template)
//!     → decorated response, or the original bytes on any failure
//! ```
//!
//! # State Machine (per request)
//! ```text
//! Intercepting → Deciding → Passthrough ───────────────┐
//!                         → Buffered → Rendering → Flushed
//!                                    ↘ (error) Passthrough
//! ```

pub mod applier;
pub mod interceptor;
pub mod selector;

pub use applier::DecoratorApplier;
pub use interceptor::{decoration_middleware, BufferedResponse, DecorationState, Pipeline, RequestContext};
pub use selector::{Decision, MimePredicate, Selector, SkipReason};
