//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod health;
pub mod tailor;

use crate::config::Settings;
use crate::middleware::{
    allowed_hosts_middleware, rate_limit_middleware, request_logging_middleware,
    InMemoryRateLimiter, RateLimiter,
};
use crate::services::{CompletionClient, ResumeService, RetryConfig, TailorService};
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub service: Arc<dyn ResumeService>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        service: Arc<dyn ResumeService>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            settings,
            service,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// State wired to the OpenAI API and an in-memory rate limiter
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = CompletionClient::from_config(&settings.openai, RetryConfig::from(&settings.retry))
            .context("Failed to create completion client")?;
        let rate_limiter = InMemoryRateLimiter::new(
            settings.rate_limit.requests,
            settings.rate_limit.period_secs,
        );

        Ok(Self::new(
            settings,
            Arc::new(TailorService::new(client)),
            Arc::new(rate_limiter),
        ))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.service.model())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Create application router
pub fn create_router(settings: Settings) -> Result<Router> {
    let state = AppState::from_settings(settings)?;
    Ok(create_router_with_state(Arc::new(state)))
}

/// Create the router around an existing state
pub fn create_router_with_state(app_state: Arc<AppState>) -> Router {
    let max_request_size = app_state.settings.security.max_request_size;

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&app_state.settings))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            allowed_hosts_middleware,
        ));

    let tailor_routes = Router::new()
        .route("/tailor", post(tailor::handle_tailor))
        .route("/tailor-upload", post(tailor::handle_tailor_upload))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/ping", get(health::ping))
        .route("/health", get(health::health_check))
        .merge(tailor_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .with_state(app_state)
        .layer(middleware_stack)
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if settings.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
