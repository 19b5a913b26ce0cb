mod achievement;
mod analysis;
mod config;
mod errors;
mod llm_client;
mod pipeline;
mod record;
mod report;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Haksaengbu API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client; the transport timeout sits just above the per-attempt one
    let request_timeout = config.analysis.attempt_timeout + std::time::Duration::from_secs(5);
    let llm = LlmClient::new(config.anthropic_api_key.clone(), request_timeout)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pipeline = Pipeline::new(Arc::new(llm), config.analysis.clone());
    let settings = pipeline.settings();
    info!(
        "Analysis settings: budget {} chars, {} attempts, {}s per attempt",
        settings.prompt_budget,
        settings.max_attempts,
        settings.attempt_timeout.as_secs()
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        config: config.clone(),
        pipeline,
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, cancelling in-flight analysis runs first.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling in-flight runs");
    shutdown.cancel();
}
