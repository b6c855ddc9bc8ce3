//! Completion client service
//!
//! Encapsulates HTTP communication with the OpenAI chat completion API and
//! the retry/backoff policy around it

use crate::config::settings::{OpenAIConfig, RetrySettings};
use crate::models::openai::*;
use crate::models::tailor::{TailorResult, UsageRecord};
use crate::services::pricing::calculate_cost;
use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failure of a single completion call
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Connection, TLS or timeout failure
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status from the provider
    #[error("Completion API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Success status but an unusable body
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Transport failures, timeouts, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport(_) => true,
            CompletionError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            CompletionError::InvalidResponse(_) => false,
        }
    }

    pub fn is_context_length_exceeded(&self) -> bool {
        matches!(
            self,
            CompletionError::Api { code: Some(code), .. } if code == "context_length_exceeded"
        )
    }
}

/// Text and token usage of one completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: OpenAIUsage,
}

/// A single outbound completion call, without retries
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &OpenAIRequest) -> Result<Completion, CompletionError>;
}

/// OpenAI API client
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIClient {
    /// Create a new client instance
    pub fn new(config: &OpenAIConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("resume-tailor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Send chat completion request
    pub async fn chat_completions(
        &self,
        request: &OpenAIRequest,
    ) -> Result<OpenAIResponse, CompletionError> {
        debug!("Sending OpenAI chat completion request for model {}", request.model);

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle HTTP response
    async fn handle_response(&self, response: Response) -> Result<OpenAIResponse, CompletionError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let parsed: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
                CompletionError::InvalidResponse(format!("failed to parse response body: {}", e))
            })?;

            debug!("OpenAI request completed successfully");
            return Ok(parsed);
        }

        // Try to parse as OpenAI error format
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
            error!("OpenAI API error: {:?}", error_response.error);
            Err(CompletionError::Api {
                status: status.as_u16(),
                message: error_response.error.message,
                code: error_response.error.code,
            })
        } else {
            error!("OpenAI API request failed: {} - {}", status, body);
            Err(CompletionError::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
                code: None,
            })
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    async fn complete(&self, request: &OpenAIRequest) -> Result<Completion, CompletionError> {
        let response = self.chat_completions(request).await?;

        let content = response.first_content().ok_or_else(|| {
            CompletionError::InvalidResponse("response contained no message content".to_string())
        })?;
        let usage = response.usage.ok_or_else(|| {
            CompletionError::InvalidResponse("response did not report token usage".to_string())
        })?;

        Ok(Completion { content, usage })
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single backoff
    pub max_delay: Duration,
    /// Retry errors that are not transient as well
    pub retry_all_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            retry_all_errors: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            retry_all_errors: settings.retry_all_errors,
        }
    }
}

impl RetryConfig {
    /// `min(max_delay, initial_delay * 2^(attempt-1))` for a 1-based attempt
    pub fn backoff_cap(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Uniformly random sleep in `[0, backoff_cap(attempt)]`
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let fraction: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        self.backoff_cap(attempt).mul_f64(fraction)
    }

    pub fn should_retry(&self, error: &CompletionError) -> bool {
        self.retry_all_errors || error.is_transient()
    }
}

/// Completion client with retry and cost accounting
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    retry: RetryConfig,
    model: String,
    max_tokens: Option<u32>,
    temperature: f32,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("retry", &self.retry)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            model: model.into(),
            max_tokens: None,
            temperature: 0.2,
        }
    }

    /// Client backed by the real OpenAI API
    pub fn from_config(config: &OpenAIConfig, retry: RetryConfig) -> anyhow::Result<Self> {
        let backend = Arc::new(OpenAIClient::new(config)?);
        Ok(Self::new(backend, config.model.clone())
            .with_retry(retry)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Chat completion request with retry
    ///
    /// The last error is returned unchanged once the attempt budget is spent.
    pub async fn complete_with_retry(
        &self,
        request: &OpenAIRequest,
    ) -> Result<Completion, CompletionError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.backend.complete(request).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    if attempt >= max_attempts {
                        error!("Completion failed after {} attempts: {}", attempt, e);
                        return Err(e);
                    }
                    if !self.retry.should_retry(&e) {
                        warn!("Completion failed with non-retryable error: {}", e);
                        return Err(e);
                    }

                    let delay = self.retry.jittered_delay(attempt);
                    warn!(
                        "Completion request failed: {}. Retry {}/{} after {:.2}s",
                        e,
                        attempt,
                        max_attempts,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run one tailoring completion and price it
    pub async fn tailor_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TailorResult, CompletionError> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage::system(system_prompt),
                OpenAIMessage::user(user_prompt),
            ],
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        };

        let completion = self.complete_with_retry(&request).await?;
        let usage = completion.usage;
        let cost_usd = calculate_cost(&self.model, usage.prompt_tokens, usage.completion_tokens);

        info!(
            model = %self.model,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "OpenAI API call completed, cost ${:.6}",
            cost_usd
        );

        Ok(TailorResult {
            content: completion.content,
            usage: UsageRecord {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                cost_usd,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails a fixed number of times, then succeeds
    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
        call_times: Mutex<Vec<tokio::time::Instant>>,
        status: u16,
    }

    impl FlakyBackend {
        fn new(failures: u32, status: u16) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
                status,
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FlakyBackend {
        async fn complete(&self, _request: &OpenAIRequest) -> Result<Completion, CompletionError> {
            self.call_times.lock().unwrap().push(tokio::time::Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(CompletionError::Api {
                    status: self.status,
                    message: format!("failure {}", call),
                    code: None,
                });
            }
            Ok(Completion {
                content: "Tailored resume".to_string(),
                usage: OpenAIUsage {
                    prompt_tokens: 100,
                    completion_tokens: 40,
                    total_tokens: 140,
                },
            })
        }
    }

    fn test_config(base_url: &str) -> OpenAIConfig {
        OpenAIConfig {
            api_key: "sk-test-key".to_string(),
            base_url: base_url.to_string(),
            model: "gpt-4".to_string(),
            max_tokens: 2000,
            temperature: 0.2,
            timeout: 5,
        }
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(60));
        assert!(config.retry_all_errors);
    }

    #[test]
    fn test_backoff_cap_doubles_then_saturates() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_cap(1), Duration::from_secs(1));
        assert_eq!(config.backoff_cap(2), Duration::from_secs(2));
        assert_eq!(config.backoff_cap(5), Duration::from_secs(16));
        assert_eq!(config.backoff_cap(7), Duration::from_secs(60));
        assert_eq!(config.backoff_cap(40), Duration::from_secs(60));
    }

    #[test]
    fn test_jittered_delay_within_cap() {
        let config = RetryConfig::default();
        for attempt in 1..=8 {
            for _ in 0..200 {
                assert!(config.jittered_delay(attempt) <= config.backoff_cap(attempt));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_sixth_attempt() {
        let backend = Arc::new(FlakyBackend::new(5, 503));
        let client = CompletionClient::new(backend.clone(), "gpt-4");

        let result = client
            .tailor_completion("system", "prompt")
            .await
            .expect("sixth attempt should succeed");

        assert_eq!(result.content, "Tailored resume");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);

        let times = backend.call_times.lock().unwrap().clone();
        let config = RetryConfig::default();
        for (index, pair) in times.windows(2).enumerate() {
            let waited = pair[1] - pair[0];
            let cap = config.backoff_cap(index as u32 + 1);
            assert!(waited <= cap, "delay {:?} exceeded cap {:?}", waited, cap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_error_propagates_unchanged() {
        let backend = Arc::new(FlakyBackend::new(u32::MAX, 401));
        let client = CompletionClient::new(backend.clone(), "gpt-4");

        let error = client.tailor_completion("system", "prompt").await.unwrap_err();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
        match error {
            CompletionError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "failure 6");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_fail_fast_when_classifying() {
        let backend = Arc::new(FlakyBackend::new(u32::MAX, 401));
        let retry = RetryConfig {
            retry_all_errors: false,
            ..RetryConfig::default()
        };
        let client = CompletionClient::new(backend.clone(), "gpt-4").with_retry(retry);

        assert!(client.tailor_completion("system", "prompt").await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_when_classifying() {
        let backend = Arc::new(FlakyBackend::new(2, 429));
        let retry = RetryConfig {
            retry_all_errors: false,
            ..RetryConfig::default()
        };
        let client = CompletionClient::new(backend.clone(), "gpt-4").with_retry(retry);

        assert!(client.tailor_completion("system", "prompt").await.is_ok());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_usage_is_priced_with_configured_model() {
        let backend = Arc::new(FlakyBackend::new(0, 500));
        let client = CompletionClient::new(backend, "gpt-4");

        let result = client.tailor_completion("system", "prompt").await.unwrap();

        assert_eq!(result.usage.input_tokens, 100);
        assert_eq!(result.usage.output_tokens, 40);
        assert_eq!(result.usage.total_tokens, 140);
        assert!((result.usage.cost_usd - 0.0054).abs() < 1e-9);
    }

    #[test]
    fn test_error_classification() {
        let api = |status| CompletionError::Api {
            status,
            message: String::new(),
            code: None,
        };
        assert!(api(429).is_transient());
        assert!(api(502).is_transient());
        assert!(!api(401).is_transient());
        assert!(!api(400).is_transient());
        assert!(!CompletionError::InvalidResponse("x".to_string()).is_transient());

        let too_long = CompletionError::Api {
            status: 400,
            message: "maximum context length".to_string(),
            code: Some("context_length_exceeded".to_string()),
        };
        assert!(too_long.is_context_length_exceeded());
    }

    #[tokio::test]
    async fn test_openai_client_parses_completion() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test-key")
                    .json_body_partial(r#"{"model": "gpt-4"}"#);
                then.status(200).json_body(serde_json::json!({
                    "id": "chatcmpl-123",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "gpt-4",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "Tailored text\n"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                }));
            })
            .await;

        let client = OpenAIClient::new(&test_config(&server.base_url())).unwrap();
        let request = OpenAIRequest {
            model: "gpt-4".to_string(),
            messages: vec![OpenAIMessage::user("hi")],
            max_tokens: Some(10),
            temperature: Some(0.2),
        };

        let completion = client.complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(completion.content, "Tailored text");
        assert_eq!(completion.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_openai_client_maps_error_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(400).json_body(serde_json::json!({
                    "error": {
                        "message": "This model's maximum context length is 8192 tokens",
                        "type": "invalid_request_error",
                        "param": "messages",
                        "code": "context_length_exceeded"
                    }
                }));
            })
            .await;

        let client = OpenAIClient::new(&test_config(&server.base_url())).unwrap();
        let request = OpenAIRequest {
            model: "gpt-4".to_string(),
            messages: vec![OpenAIMessage::user("hi")],
            max_tokens: None,
            temperature: None,
        };

        let error = client.complete(&request).await.unwrap_err();
        assert!(error.is_context_length_exceeded());
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn test_retry_against_failing_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("upstream exploded");
            })
            .await;

        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            retry_all_errors: true,
        };
        let client = CompletionClient::from_config(&test_config(&server.base_url()), retry).unwrap();

        let error = client.tailor_completion("system", "prompt").await.unwrap_err();

        mock.assert_hits_async(3).await;
        match error {
            CompletionError::Api { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
