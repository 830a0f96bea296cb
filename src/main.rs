//! page-decorator
//!
//! Serves an application (static pages and/or an upstream server) behind a
//! filter that wraps HTML responses in decorator templates.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                  PAGE DECORATOR                     │
//!   Client Request    │  ┌─────────┐   ┌─────────────┐   ┌──────────────┐   │
//!   ──────────────────┼─▶│  http   │──▶│ interceptor │──▶│ application  │───┼──▶ Upstream
//!                     │  │ server  │   │  (buffer)   │   │ pages/proxy  │   │
//!                     │  └─────────┘   └──────┬──────┘   └──────────────┘   │
//!                     │                       ▼                             │
//!                     │   ┌──────────┐  ┌───────────┐  ┌──────────────┐     │
//!                     │   │ selector │─▶│ extractor │─▶│   applier    │     │
//!                     │   │ (routing)│  │  (HTML)   │  │ (templates)  │     │
//!                     │   └──────────┘  └───────────┘  └──────┬───────┘     │
//!   Client Response   │                                       │             │
//!   ◀─────────────────┼───────────── decorated or original ◀──┘             │
//!                     └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use page_decorator::config::{load_config, ServerConfig};
use page_decorator::observability::{logging, metrics};
use page_decorator::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "page-decorator")]
#[command(about = "Wraps HTML responses in decorator templates", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("page-decorator v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        bindings = config.decoration.bindings.len(),
        inline_templates = config.templates.inline.len(),
        template_directory = ?config.templates.directory,
        upstream = ?config.upstream.as_ref().map(|u| &u.address),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
