//! Health check handlers
//!
//! Provides liveness (`/ping`) and status (`/health`) endpoints

use crate::handlers::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub version: String,
    /// Seconds since the router was built
    pub uptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub dependencies: DependencyStatus,
}

/// Dependency health snapshot
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Completion provider credentials
    pub openai: String,
    /// Output directory
    pub file_system: String,
}

/// Ping
///
/// GET /ping
pub async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ping": "pong" }))
}

/// Health check
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    let openai = if state.settings.openai.api_key.is_empty() {
        "not_configured"
    } else {
        "configured"
    };
    let file_system = if output_dir_available(&state.settings.storage.output_dir).await {
        "ok"
    } else {
        "unavailable"
    };

    let healthy = openai == "configured" && file_system == "ok";

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: crate::VERSION.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        message: (!healthy).then(|| "One or more dependencies are unavailable".to_string()),
        dependencies: DependencyStatus {
            openai: openai.to_string(),
            file_system: file_system.to_string(),
        },
    })
}

async fn output_dir_available(dir: &Path) -> bool {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) => metadata.is_dir(),
        Err(_) => tokio::fs::create_dir_all(dir).await.is_ok(),
    }
}
