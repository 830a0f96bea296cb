//! Response interception middleware.
//!
//! # Responsibilities
//! - Mark the request as being decorated (nested filters pass through)
//! - Let the application produce its response exactly once
//! - Buffer the body when the selector wants to decorate it
//! - Replace the body with the decorated page, or replay the original bytes
//!
//! # Design Decisions
//! - Fail open: any extraction or render error sends the original response
//! - Responses that will not be decorated are streamed, never buffered
//! - Bodies over the buffer limit are replayed chunk-for-chunk

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, response::Parts, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::{stream, StreamExt};

use crate::config::DecorationConfig;
use crate::content::{ContentExtractor, HtmlExtractor};
use crate::decoration::applier::DecoratorApplier;
use crate::decoration::selector::{Decision, Selector, SkipReason};
use crate::error::DecorationError;
use crate::observability::metrics;
use crate::routing::PatternError;
use crate::template::TemplateEngine;

/// Per-request decoration state, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    path: String,
    content_type: OnceLock<String>,
    decorated: AtomicBool,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                path: path.into(),
                content_type: OnceLock::new(),
                decorated: AtomicBool::new(false),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Content type declared by the application, once its response is in.
    pub fn content_type(&self) -> Option<&str> {
        self.inner.content_type.get().map(String::as_str)
    }

    pub fn is_decorated(&self) -> bool {
        self.inner.decorated.load(Ordering::Acquire)
    }

    fn record_content_type(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            // First write wins; later header observations are ignored.
            let _ = self.inner.content_type.set(value.to_string());
        }
    }

    fn mark_decorated(&self) {
        self.inner.decorated.store(true, Ordering::Release);
    }
}

/// A fully buffered application response.
#[derive(Debug)]
pub struct BufferedResponse {
    parts: Parts,
    body: Bytes,
}

impl BufferedResponse {
    /// Read the whole body, up to `limit` bytes.
    ///
    /// If the body is larger, or fails mid-stream, the returned `Err` holds a
    /// response that replays what was read followed by the rest of the stream
    /// (or the same error).
    pub async fn collect(response: Response, limit: usize) -> Result<Self, (Response, SkipReason)> {
        let (parts, body) = response.into_parts();
        let mut data = body.into_data_stream();
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut total = 0usize;

        while let Some(chunk) = data.next().await {
            match chunk {
                Ok(chunk) => {
                    total += chunk.len();
                    chunks.push(chunk);
                    if total > limit {
                        let replay = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>)).chain(data);
                        return Err((Response::from_parts(parts, Body::from_stream(replay)), SkipReason::TooLarge));
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Application body failed while buffering");
                    let replay = stream::iter(chunks.into_iter().map(Ok).chain(std::iter::once(Err(e))));
                    return Err((Response::from_parts(parts, Body::from_stream(replay)), SkipReason::BodyError));
                }
            }
        }

        let body = match chunks.len() {
            0 => Bytes::new(),
            1 => chunks.remove(0),
            _ => {
                let mut joined = Vec::with_capacity(total);
                for chunk in &chunks {
                    joined.extend_from_slice(chunk);
                }
                Bytes::from(joined)
            }
        };
        Ok(Self { parts, body })
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// The original response, byte for byte.
    pub fn into_response(self) -> Response {
        Response::from_parts(self.parts, Body::from(self.body))
    }

    /// Same status and headers with a new body. Length and validators are dropped.
    pub fn into_decorated(mut self, body: Bytes) -> Response {
        self.parts.headers.remove(header::CONTENT_LENGTH);
        self.parts.headers.remove(header::ETAG);
        self.parts.headers.remove(header::LAST_MODIFIED);
        Response::from_parts(self.parts, Body::from(body))
    }
}

/// Selector, extractor and applier wired together.
pub struct Pipeline {
    selector: Selector,
    extractor: Arc<dyn ContentExtractor>,
    applier: DecoratorApplier,
    honor_meta_decorator: bool,
    max_buffer_bytes: usize,
}

impl Pipeline {
    pub fn new(selector: Selector, engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            selector,
            extractor: Arc::new(HtmlExtractor::new()),
            applier: DecoratorApplier::new(engine),
            honor_meta_decorator: true,
            max_buffer_bytes: DecorationConfig::default().max_buffer_bytes,
        }
    }

    pub fn from_config(config: &DecorationConfig, engine: Arc<dyn TemplateEngine>) -> Result<Self, PatternError> {
        Ok(Self::new(Selector::from_config(config)?, engine)
            .honor_meta_decorator(config.honor_meta_decorator)
            .max_buffer_bytes(config.max_buffer_bytes))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn honor_meta_decorator(mut self, honor: bool) -> Self {
        self.honor_meta_decorator = honor;
        self
    }

    pub fn max_buffer_bytes(mut self, limit: usize) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Extract and render. `Ok(None)` means the page opted out of decoration.
    pub fn decorate(&self, raw: Bytes, decorator: &str) -> Result<Option<Bytes>, DecorationError> {
        let content = self.extractor.extract(raw);
        if !content.is_extracted() {
            return Err(DecorationError::ParseFailure(
                "page structure could not be recovered".to_string(),
            ));
        }

        let decorator = match content.property("meta.decorator").map(str::trim) {
            Some("none") if self.honor_meta_decorator => return Ok(None),
            Some(id) if self.honor_meta_decorator && !id.is_empty() => id,
            _ => decorator,
        };
        self.applier.apply(&content, decorator).map(Some)
    }

    /// Turn the application's response into the response sent to the client.
    pub async fn process(&self, context: &RequestContext, response: Response) -> Response {
        context.record_content_type(response.headers());

        let decorator = match self
            .selector
            .decide(context.path(), response.status(), response.headers())
        {
            Decision::Decorate(decorator) => decorator,
            Decision::Passthrough(reason) => return passthrough(context, reason, response),
        };

        let declared_len = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > self.max_buffer_bytes) {
            return passthrough(context, SkipReason::TooLarge, response);
        }

        let buffered = match BufferedResponse::collect(response, self.max_buffer_bytes).await {
            Ok(buffered) => buffered,
            Err((replay, reason)) => return passthrough(context, reason, replay),
        };

        match self.decorate(buffered.bytes().clone(), &decorator) {
            Ok(Some(page)) => {
                context.mark_decorated();
                metrics::record_decorated(&decorator);
                tracing::debug!(path = %context.path(), decorator = %decorator, "Page decorated");
                buffered.into_decorated(page)
            }
            Ok(None) => passthrough(context, SkipReason::PageOptOut, buffered.into_response()),
            Err(e) => {
                tracing::warn!(
                    path = %context.path(),
                    decorator = %decorator,
                    error = %e,
                    "Decoration failed, sending page undecorated"
                );
                metrics::record_fallback(e.reason());
                buffered.into_response()
            }
        }
    }
}

fn passthrough(context: &RequestContext, reason: SkipReason, response: Response) -> Response {
    tracing::trace!(path = %context.path(), reason = reason.as_str(), "Passing response through");
    metrics::record_passthrough(reason.as_str());
    response
}

/// Shared middleware state.
#[derive(Clone)]
pub struct DecorationState {
    pipeline: Arc<Pipeline>,
}

impl DecorationState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Decoration filter. Register with `axum::middleware::from_fn_with_state`.
pub async fn decoration_middleware(
    State(state): State<DecorationState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // An outer filter already owns this request.
    if req.extensions().get::<RequestContext>().is_some() {
        metrics::record_passthrough(SkipReason::AlreadyDecorated.as_str());
        return next.run(req).await;
    }

    let context = RequestContext::new(req.uri().path());
    req.extensions_mut().insert(context.clone());

    if req.method() == Method::HEAD {
        let response = next.run(req).await;
        return passthrough(&context, SkipReason::Method, response);
    }

    let response = next.run(req).await;
    state.pipeline.process(&context, response).await
}
