//! Page content extraction.
//!
//! # Data Flow
//! ```text
//! buffered bytes
//!     → extractor.rs (tl node tree, locate title/head/body, capture properties)
//!     → page.rs (StructuredContent, read-only)
//! ```

pub mod extractor;
pub mod page;

pub use extractor::{ContentExtractor, HtmlExtractor};
pub use page::StructuredContent;
