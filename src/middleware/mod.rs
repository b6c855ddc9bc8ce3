//! HTTP middleware
//!
//! Request logging, host filtering and rate limiting

pub mod logging;
pub mod rate_limit;

pub use logging::{allowed_hosts_middleware, request_logging_middleware, RequestId};
pub use rate_limit::{rate_limit_middleware, InMemoryRateLimiter, RateDecision, RateLimiter};
