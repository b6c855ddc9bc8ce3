//! Error handling module
//!
//! Defines the error taxonomy surfaced to HTTP and CLI callers

use crate::services::client::CompletionError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    RateLimitExceeded,
    TokenLimitExceeded,
    ApiError,
    FileSystemError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::TokenLimitExceeded => "TOKEN_LIMIT_EXCEEDED",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::FileSystemError => "FILE_SYSTEM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed, too short or too long input
    #[error("Request validation failed: {message}")]
    Validation {
        message: String,
        suggestion: Option<String>,
    },

    /// Uploaded file with an extension other than .pdf/.docx/.txt
    #[error("Unsupported file type: {0}. Supported types: .txt, .pdf, .docx")]
    UnsupportedFileType(String),

    /// A supported file whose contents could not be read
    #[error("Failed to extract text: {0}")]
    Extraction(String),

    /// Inbound rate limit exceeded
    #[error("Too many requests")]
    RateLimitExceeded { retry_after: u64 },

    /// Input too long for the model
    #[error("Input text too long: {message}")]
    TokenLimitExceeded { message: String },

    /// Completion provider failed after the retry budget
    #[error("Completion API error: {0}")]
    Upstream(CompletionError),

    /// Failed to persist output
    #[error("Failed to save output file: {0}")]
    FileSystem(#[from] std::io::Error),

    /// Anything unexpected
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error detail block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    pub error: ErrorDetail,
    /// Request ID (for tracking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::UnsupportedFileType(_)
            | AppError::Extraction(_)
            | AppError::TokenLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) | AppError::FileSystem(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get machine-readable error code
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. }
            | AppError::UnsupportedFileType(_)
            | AppError::Extraction(_) => ErrorCode::ValidationError,
            AppError::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            AppError::TokenLimitExceeded { .. } => ErrorCode::TokenLimitExceeded,
            AppError::Upstream(_) => ErrorCode::ApiError,
            AppError::FileSystem(_) => ErrorCode::FileSystemError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Remediation hint for the caller
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AppError::Validation { suggestion, .. } => Some(
                suggestion
                    .clone()
                    .unwrap_or_else(|| "Check the request fields and try again".to_string()),
            ),
            AppError::UnsupportedFileType(_) => {
                Some("Upload a file with .pdf, .docx, or .txt extension".to_string())
            }
            AppError::Extraction(_) => Some("Check file format and try again".to_string()),
            AppError::RateLimitExceeded { .. } => {
                Some("Please wait a minute before trying again".to_string())
            }
            AppError::TokenLimitExceeded { .. } => {
                Some("Try reducing input text length".to_string())
            }
            AppError::Upstream(_) => Some("Check API key or try again later".to_string()),
            AppError::FileSystem(_) | AppError::Internal(_) => None,
        }
    }

    /// Seconds the caller should wait before retrying
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AppError::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Message exposed to HTTP callers; internal details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::FileSystem(_) => "Failed to save output file".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the error is the server's fault
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Build the JSON body
    pub fn to_error_response(&self, correlation_id: Option<String>) -> ErrorResponse {
        ErrorResponse {
            status: "error".to_string(),
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
            },
            correlation_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            retry_after: self.retry_after(),
            suggestion: self.suggestion(),
        }
    }

    /// Attach a request correlation id
    pub fn correlate(self, correlation_id: impl Into<String>) -> CorrelatedError {
        CorrelatedError {
            error: self,
            correlation_id: Some(correlation_id.into()),
        }
    }

    fn into_response_with(self, correlation_id: Option<String>) -> Response {
        let status = self.status_code();

        if self.is_server_error() {
            tracing::error!(
                correlation_id = correlation_id.as_deref().unwrap_or("-"),
                "Application error: {} - Status code: {}",
                self,
                status
            );
        } else {
            tracing::warn!(
                correlation_id = correlation_id.as_deref().unwrap_or("-"),
                "Client error: {} - {}",
                self.code().as_str(),
                self
            );
        }

        let body = self.to_error_response(correlation_id);
        let mut response = (status, Json(body)).into_response();

        if let Some(seconds) = self.retry_after() {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<CompletionError> for AppError {
    fn from(error: CompletionError) -> Self {
        if error.is_context_length_exceeded() {
            AppError::TokenLimitExceeded {
                message: error.to_string(),
            }
        } else {
            AppError::Upstream(error)
        }
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(None)
    }
}

/// An [`AppError`] tagged with the request id it belongs to
#[derive(Debug)]
pub struct CorrelatedError {
    pub error: AppError,
    pub correlation_id: Option<String>,
}

impl IntoResponse for CorrelatedError {
    fn into_response(self) -> Response {
        self.error.into_response_with(self.correlation_id)
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Error handling helper functions
pub mod helpers {
    use super::*;

    /// Create validation error
    pub fn validation_error(message: impl Into<String>) -> AppError {
        AppError::Validation {
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create validation error with a specific suggestion
    pub fn validation_error_with(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> AppError {
        AppError::Validation {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create internal error
    pub fn internal_error(message: impl Into<String>) -> AppError {
        AppError::Internal(anyhow::anyhow!(message.into()))
    }
}
