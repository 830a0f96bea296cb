//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the application handler
//! - Register the decoration filter over every route
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ServerConfig, TemplatesConfig};
use crate::decoration::{decoration_middleware, DecorationState, Pipeline};
use crate::http::pages::StaticPages;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::upstream::Upstream;
use crate::routing::PatternError;
use crate::template::{DirectoryTemplates, MemoryTemplates, TemplateEngine, TemplateError, TemplateSet};

/// Reasons the server cannot be built from a configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid path pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid upstream address '{address}': {source}")]
    Upstream {
        address: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<StaticPages>,
    pub upstream: Option<Upstream>,
}

/// HTTP server hosting the application behind the decoration filter.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, StartupError> {
        let engine = build_templates(&config.templates)?;
        let pipeline = Pipeline::from_config(&config.decoration, engine)?;
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server with a pre-built pipeline (custom template engine or extractor).
    pub fn with_pipeline(config: ServerConfig, pipeline: Pipeline) -> Result<Self, StartupError> {
        let upstream = match &config.upstream {
            Some(upstream) => Some(
                Upstream::parse(&upstream.address, Duration::from_secs(config.timeouts.upstream_secs))
                    .map_err(|source| StartupError::Upstream {
                        address: upstream.address.clone(),
                        source,
                    })?,
            ),
            None => None,
        };

        let state = AppState {
            pages: Arc::new(StaticPages::from_config(&config.pages)),
            upstream,
        };
        let decoration = config
            .decoration
            .enabled
            .then(|| DecorationState::new(pipeline));

        let router = Self::build_router(&config, state, decoration);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState, decoration: Option<DecorationState>) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(app_handler))
            .route("/", any(app_handler))
            .with_state(state);

        if let Some(decoration) = decoration {
            router = router.layer(middleware::from_fn_with_state(decoration, decoration_middleware));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The composed router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            bindings = self.config.decoration.bindings.len(),
            pages = self.config.pages.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Inline templates first, then the template directory.
pub fn build_templates(config: &TemplatesConfig) -> Result<Arc<dyn TemplateEngine>, TemplateError> {
    let mut set = TemplateSet::new();

    if !config.inline.is_empty() {
        let mut inline = MemoryTemplates::new();
        for (id, source) in &config.inline {
            inline = inline.put(id.clone(), source)?;
        }
        set = set.with_engine(Arc::new(inline));
    }
    if let Some(directory) = &config.directory {
        set = set.with_engine(Arc::new(DirectoryTemplates::new(directory)));
    }

    Ok(Arc::new(set))
}

/// The application: static pages, then the upstream, then 404.
async fn app_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if let Some(page) = state.pages.get(request.uri().path()) {
        return page.respond(request.method());
    }
    match &state.upstream {
        Some(upstream) => upstream.forward(request).await,
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}
