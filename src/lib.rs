//! Resume Tailor Library
//!
//! Rewrites a resume to match a job description using the OpenAI chat
//! completion API, behind an HTTP service and a command-line tool

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, create_router_with_state, AppState};
pub use models::{TailorRequest, TailorResponse, TailorResult, Tone, UsageRecord};
pub use services::{CompletionClient, OpenAIClient, ResumeService, RetryConfig, TailorService};
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
