//! Logging middleware
//!
//! Records HTTP request and response information and assigns request ids

use crate::utils::error::helpers::validation_error_with;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Requests slower than this are logged as warnings
const SLOW_REQUEST_SECS: u64 = 5;

/// Per-request id, stored as a request extension and used as correlation id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request logging middleware
///
/// Reuses an incoming `x-request-id` when present, otherwise generates one,
/// and echoes it on the response
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let request_id = incoming_request_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
    );

    async move {
        info!(
            "Request started: {} {} - User-Agent: {}",
            method,
            uri,
            headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
        );

        let mut response = next.run(request).await;

        let duration = start_time.elapsed();
        let status = response.status();
        let millis = duration.as_secs_f64() * 1000.0;

        if status.is_server_error() {
            warn!("Server error: {} - Duration: {:.2}ms", status, millis);
        } else if status.is_client_error() {
            warn!("Client error: {} - Duration: {:.2}ms", status, millis);
        } else {
            info!("Request completed: {} - Duration: {:.2}ms", status, millis);
        }

        if duration.as_secs() >= SLOW_REQUEST_SECS {
            warn!(
                "Slow request detected: {} {} - Duration: {:.2}s",
                method,
                uri,
                duration.as_secs_f64()
            );
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
}

/// Allowed hosts guard
///
/// Rejects requests whose `Host` header is not in `ALLOWED_HOSTS`; an empty
/// list admits every host
pub async fn allowed_hosts_middleware(
    State(state): State<Arc<crate::handlers::AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let allowed = &state.settings.security.allowed_hosts;
    if allowed.is_empty() {
        return next.run(request).await;
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if host_is_allowed(host, allowed) {
        return next.run(request).await;
    }

    warn!("Rejected request for disallowed host: {}", host);
    let error = validation_error_with(
        format!("Invalid host header: {}", host),
        "Send the request to one of the configured hosts",
    );
    match request.extensions().get::<RequestId>() {
        Some(id) => error.correlate(id.as_str()).into_response(),
        None => error.into_response(),
    }
}

/// Compare a Host header (port ignored) against the allow-list
pub fn host_is_allowed(host: &str, allowed: &[String]) -> bool {
    let name = strip_port(host).to_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.to_lowercase();
        if entry == "*" {
            true
        } else if let Some(suffix) = entry.strip_prefix("*.") {
            name.ends_with(&format!(".{}", suffix))
        } else {
            entry == name || strip_port(&entry) == name
        }
    })
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}
