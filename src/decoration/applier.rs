//! Merges structured content into a decorator template.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;

use crate::content::StructuredContent;
use crate::error::DecorationError;
use crate::observability::metrics;
use crate::template::{TemplateEngine, TemplateError};

/// Renders decorators through a pluggable template engine.
#[derive(Clone)]
pub struct DecoratorApplier {
    engine: Arc<dyn TemplateEngine>,
}

impl DecoratorApplier {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Render `decorator` with `content.title`, `content.head`, `content.body`
    /// and every extra property bound.
    pub fn apply(&self, content: &StructuredContent, decorator: &str) -> Result<Bytes, DecorationError> {
        let handle = self.engine.lookup(decorator).map_err(|e| match e {
            TemplateError::NotFound(_) => DecorationError::DecoratorNotFound(decorator.to_string()),
            source => DecorationError::Render {
                decorator: decorator.to_string(),
                source,
            },
        })?;

        let started = Instant::now();
        let rendered = self
            .engine
            .render(&handle, &content.to_bindings())
            .map_err(|source| DecorationError::Render {
                decorator: decorator.to_string(),
                source,
            })?;
        metrics::record_render(decorator, started);

        Ok(Bytes::from(rendered))
    }
}
