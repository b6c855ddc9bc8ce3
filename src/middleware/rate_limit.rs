//! Rate limiting middleware
//!
//! Counts requests per client in fixed time buckets and rejects clients that
//! exceed the configured limit

use crate::middleware::logging::RequestId;
use crate::utils::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted, `remaining` further requests fit in the bucket
    Allowed { remaining: u32 },
    /// Request rejected, retry after this many seconds
    Denied { retry_after: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Admission control keyed by client identifier
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, client_id: &str) -> RateDecision;
}

/// Bucketed request counter held in process memory
///
/// The whole check-and-increment runs under one lock, so concurrent requests
/// from the same client can never both take the last slot.
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<u64, HashMap<String, u32>>>,
    max_requests: u32,
    period_secs: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, period_secs: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            period_secs: period_secs.max(1),
        }
    }

    /// Check against an explicit unix timestamp in seconds
    pub async fn check_at(&self, client_id: &str, now_secs: u64) -> RateDecision {
        let bucket = now_secs - now_secs % self.period_secs;
        let mut windows = self.windows.lock().await;

        if !windows.contains_key(&bucket) {
            let cutoff = now_secs.saturating_sub(self.period_secs);
            windows.retain(|start, _| *start >= cutoff);
            windows.insert(bucket, HashMap::new());
        }

        let counts = windows.entry(bucket).or_default();
        let count = counts.entry(client_id.to_string()).or_insert(0);

        if *count >= self.max_requests {
            return RateDecision::Denied {
                retry_after: self.period_secs,
            };
        }

        *count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - *count,
        }
    }

    /// Number of buckets currently held
    pub async fn bucket_count(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, client_id: &str) -> RateDecision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.check_at(client_id, now).await
    }
}

/// Rate limiting middleware
///
/// Applied to the tailoring routes only; denial happens before the body is read.
pub async fn rate_limit_middleware(
    State(state): State<Arc<crate::handlers::AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let connect_info = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_id = client_identifier(
        request.headers(),
        connect_info,
        state.settings.rate_limit.trust_proxy_headers,
    );

    match state.rate_limiter.check(&client_id).await {
        RateDecision::Allowed { remaining } => {
            debug!("Client {} admitted, {} requests remaining", client_id, remaining);
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        RateDecision::Denied { retry_after } => {
            warn!("Client {} exceeded rate limit", client_id);
            let error = AppError::RateLimitExceeded { retry_after };
            match request.extensions().get::<RequestId>() {
                Some(id) => error.correlate(id.as_str()).into_response(),
                None => error.into_response(),
            }
        }
    }
}

/// Get client identifier
///
/// The socket address wins unless proxy headers are trusted; forwarded
/// headers are also used when no socket address is known.
pub fn client_identifier(
    headers: &HeaderMap,
    connect_info: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers || connect_info.is_none() {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }

    match connect_info {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        // X-Forwarded-For may contain multiple IPs, take the first one
        if let Some(ip) = forwarded_for.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}
