//! Resume Tailor API Server
//!
//! HTTP service that tailors resumes to job descriptions

use anyhow::{Context, Result};
use resume_tailor::{create_router, utils::logging::init_logging, Settings};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new().context("Failed to load server settings")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&settings.logging, &settings.storage)?;
    info!("Server settings loaded, model: {}", settings.openai.model);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = create_router(settings)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 Resume Tailor server started!");
    info!("📝 Health check: http://{}/health", addr);
    info!("✍️  Tailor endpoint: http://{}/tailor", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
