//! Decorator template back-ends.
//!
//! # Data Flow
//! ```text
//! decorator id
//!     → TemplateEngine::lookup (memory.rs, directory.rs, or a TemplateSet chain)
//!     → TemplateHandle (compiled via interpolate.rs)
//!     → TemplateEngine::render(handle, bindings)
//!     → rendered page
//! ```
//!
//! # Design Decisions
//! - The pipeline only sees the `TemplateEngine` trait
//! - Bindings are a flat `key → markup` map exposed under `content.`
//! - Handles are cheap to clone and self-contained

pub mod directory;
pub mod interpolate;
pub mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub use directory::DirectoryTemplates;
pub use interpolate::CompiledTemplate;
pub use memory::MemoryTemplates;

/// Variable name → value handed to a template.
pub type Bindings = BTreeMap<String, String>;

/// Template lookup and rendering failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("invalid template id '{0}'")]
    InvalidId(String),

    #[error("syntax error in template '{template}' at byte {offset}: {message}")]
    Syntax {
        template: String,
        offset: usize,
        message: String,
    },

    #[error("undefined variable '{0}'")]
    Undefined(String),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A resolved decorator template.
#[derive(Debug, Clone)]
pub struct TemplateHandle {
    id: String,
    template: Arc<CompiledTemplate>,
}

impl TemplateHandle {
    pub fn new(id: impl Into<String>, template: CompiledTemplate) -> Self {
        Self {
            id: id.into(),
            template: Arc::new(template),
        }
    }

    /// Handle over an already shared template.
    pub fn shared(id: impl Into<String>, template: Arc<CompiledTemplate>) -> Self {
        Self { id: id.into(), template }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }
}

/// Capability interface for a templating back-end.
pub trait TemplateEngine: Send + Sync {
    /// Resolve a decorator id. `TemplateError::NotFound` if it is unknown.
    fn lookup(&self, id: &str) -> Result<TemplateHandle, TemplateError>;

    /// Render a handle previously returned by `lookup`.
    fn render(&self, handle: &TemplateHandle, bindings: &Bindings) -> Result<String, TemplateError> {
        handle.template().render(bindings)
    }
}

/// Ordered chain of engines; the first one that knows an id wins.
#[derive(Clone, Default)]
pub struct TemplateSet {
    engines: Vec<Arc<dyn TemplateEngine>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl TemplateEngine for TemplateSet {
    fn lookup(&self, id: &str) -> Result<TemplateHandle, TemplateError> {
        for engine in &self.engines {
            match engine.lookup(id) {
                Err(TemplateError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(TemplateError::NotFound(id.to_string()))
    }
}
