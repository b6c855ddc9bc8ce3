//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Completion provider configuration
    pub openai: OpenAIConfig,
    /// Retry policy for outbound completion calls
    pub retry: RetrySettings,
    /// Inbound rate limiting
    pub rate_limit: RateLimitConfig,
    /// Output and log locations
    pub storage: StorageConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Model used for tailoring
    pub model: String,
    /// Maximum completion tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Retry configuration as read from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Retry authentication and validation failures as well as transient ones
    pub retry_all_errors: bool,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per period
    pub requests: u32,
    /// Bucket width in seconds
    pub period_secs: u64,
    /// Identify clients by X-Forwarded-For / X-Real-IP before the socket address
    pub trust_proxy_headers: bool,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for tailored resumes
    pub output_dir: PathBuf,
    /// Directory for rolling log files
    pub log_dir: PathBuf,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
    /// Host header allow-list, empty means any host
    pub allowed_hosts: Vec<String>,
    /// Production mode
    pub production: bool,
    /// Maximum request size in bytes
    pub max_request_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", "0.0.0.0"),
                port: first_env(&["SERVER_PORT", "PORT"])
                    .unwrap_or_else(|| "8000".to_string())
                    .parse()
                    .context("Invalid port number")?,
            },
            openai: OpenAIConfig {
                api_key: resolve_api_key()
                    .context("OPENAI_API_KEY environment variable not set (GPT_SECRET_KEY is also accepted)")?,
                base_url: get_env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: get_env_or_default("MODEL_NAME", "gpt-4"),
                max_tokens: get_env_or_default("MAX_TOKENS", "2000")
                    .parse()
                    .context("Invalid max tokens value")?,
                temperature: get_env_or_default("TEMPERATURE", "0.2")
                    .parse()
                    .context("Invalid temperature value")?,
                timeout: get_env_or_default("REQUEST_TIMEOUT", "120")
                    .parse()
                    .context("Invalid timeout value")?,
            },
            retry: RetrySettings {
                max_attempts: get_env_or_default("RETRY_MAX_ATTEMPTS", "6")
                    .parse()
                    .context("Invalid retry attempt count")?,
                initial_delay_ms: get_env_or_default("RETRY_INITIAL_DELAY_MS", "1000")
                    .parse()
                    .context("Invalid retry initial delay")?,
                max_delay_ms: get_env_or_default("RETRY_MAX_DELAY_MS", "60000")
                    .parse()
                    .context("Invalid retry maximum delay")?,
                retry_all_errors: parse_flag(&get_env_or_default("RETRY_ALL_ERRORS", "true"))
                    .context("Invalid RETRY_ALL_ERRORS flag")?,
            },
            rate_limit: RateLimitConfig {
                requests: get_env_or_default("RATE_LIMIT_REQUESTS", "60")
                    .parse()
                    .context("Invalid rate limit request count")?,
                period_secs: get_env_or_default("RATE_LIMIT_PERIOD", "60")
                    .parse()
                    .context("Invalid rate limit period")?,
                trust_proxy_headers: parse_flag(&get_env_or_default("TRUST_PROXY_HEADERS", "false"))
                    .context("Invalid TRUST_PROXY_HEADERS flag")?,
            },
            storage: StorageConfig {
                output_dir: PathBuf::from(get_env_or_default("OUTPUT_DIR", "data/output")),
                log_dir: PathBuf::from(get_env_or_default("LOG_DIR", "logs")),
            },
            security: SecurityConfig {
                cors_origins: split_list(&get_env_or_default("CORS_ORIGINS", "*")),
                allowed_hosts: split_list(&get_env_or_default("ALLOWED_HOSTS", "")),
                production: is_production_env(),
                max_request_size: get_env_or_default("MAX_REQUEST_SIZE", "10485760")
                    .parse()
                    .context("Invalid maximum request size")?,
            },
            logging: LoggingConfig {
                level: first_env(&["LOG_LEVEL", "RUST_LOG"])
                    .unwrap_or_else(|| "info".to_string())
                    .to_lowercase(),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.openai.api_key.is_empty() {
            anyhow::bail!("OpenAI API key cannot be empty");
        }

        if self.openai.api_key.contains(char::is_whitespace) {
            anyhow::bail!("OpenAI API key cannot contain whitespace characters");
        }

        if self.security.production && !self.openai.api_key.starts_with("sk-") {
            anyhow::bail!("Invalid OpenAI API key format, production keys must start with 'sk-'");
        }

        if !self.openai.base_url.starts_with("http") {
            anyhow::bail!("Invalid OpenAI base URL format, should start with 'http'");
        }

        if self.openai.model.trim().is_empty() {
            anyhow::bail!("Model name cannot be empty");
        }

        if self.openai.max_tokens == 0 {
            anyhow::bail!("Max tokens cannot be 0");
        }

        if !(0.0..=2.0).contains(&self.openai.temperature) {
            anyhow::bail!("Temperature must be between 0.0 and 2.0");
        }

        if self.openai.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("Retry attempts must be at least 1");
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            anyhow::bail!("Retry initial delay cannot exceed the maximum delay");
        }

        if self.rate_limit.requests == 0 {
            anyhow::bail!("Rate limit request count cannot be 0");
        }

        if self.rate_limit.period_secs == 0 {
            anyhow::bail!("Rate limit period cannot be 0");
        }

        if self.security.max_request_size == 0 {
            anyhow::bail!("Maximum request size cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Whether every CORS origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.security.cors_origins.is_empty()
            || self.security.cors_origins.iter().any(|origin| origin == "*")
    }
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// First non-empty value among several variable names
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

/// OPENAI_API_KEY takes precedence over GPT_SECRET_KEY
fn resolve_api_key() -> Option<String> {
    first_env(&["OPENAI_API_KEY", "GPT_SECRET_KEY"])
}

fn is_production_env() -> bool {
    let render = env::var("RENDER")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);
    let env_name = env::var("ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);
    render || env_name
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("a.com, b.com,,"), vec!["a.com", "b.com"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
