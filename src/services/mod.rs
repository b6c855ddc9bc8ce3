//! Service layer module
//!
//! Contains the completion client, cost calculation, text extraction,
//! output persistence and the tailoring service

pub mod client;
pub mod extractor;
pub mod output;
pub mod pricing;
pub mod tailor;

pub use client::{CompletionBackend, CompletionClient, CompletionError, OpenAIClient, RetryConfig};
pub use tailor::{ResumeService, TailorService};
