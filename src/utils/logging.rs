//! Logging utilities
//!
//! Subscriber setup and helpers that keep resume text out of the logs

use crate::config::settings::{LoggingConfig, StorageConfig};
use crate::models::tailor::TailorRequest;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Name of the daily-rolling log file under the log directory
pub const LOG_FILE_NAME: &str = "resume_tailor.log";

/// Initialize logging system
///
/// Console output follows `LOG_FORMAT`; a JSON copy goes to a daily-rolling
/// file. The returned guard must be kept alive to flush the file writer.
pub fn init_logging(logging: &LoggingConfig, storage: &StorageConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&storage.log_dir).with_context(|| {
        format!("Failed to create log directory {}", storage.log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::daily(&storage.log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(&logging.level)
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    let console_layer = if logging.format == "json" {
        // JSON format logs (production environment)
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        // Human readable format (development environment)
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    tracing::info!("Logging system initialized");
    Ok(guard)
}

/// Loggable summary of a tailoring request: lengths and tone, never the text
pub fn request_log_summary(request: &TailorRequest) -> serde_json::Value {
    serde_json::json!({
        "resume_chars": request.resume_text.chars().count(),
        "job_description_chars": request.job_description.chars().count(),
        "tone": request.tone,
        "save_output": request.save_output,
    })
}
