//! Error types for the decoration pipeline.

use thiserror::Error;

use crate::template::TemplateError;

/// Why a page could not be decorated.
///
/// None of these reach the client: the interceptor logs them and sends the
/// original response instead.
#[derive(Debug, Error)]
pub enum DecorationError {
    /// The buffered body could not be parsed as HTML.
    #[error("could not extract page structure: {0}")]
    ParseFailure(String),

    /// The selected decorator id has no template.
    #[error("no template registered for decorator '{0}'")]
    DecoratorNotFound(String),

    /// The template engine failed to load or render the decorator.
    #[error("decorator '{decorator}' failed to render: {source}")]
    Render {
        decorator: String,
        #[source]
        source: TemplateError,
    },
}

impl DecorationError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DecorationError::ParseFailure(_) => "parse_failure",
            DecorationError::DecoratorNotFound(_) => "decorator_not_found",
            DecorationError::Render { .. } => "render_error",
        }
    }
}
