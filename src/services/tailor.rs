//! Resume tailoring service
//!
//! Builds the prompt and delegates to the completion client

use crate::models::tailor::{TailorResult, Tone};
use crate::services::client::CompletionClient;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use tracing::debug;

/// Fixed system role instruction
pub const SYSTEM_PROMPT: &str = "You are a professional resume tailoring assistant.";

/// Tailoring capability used by the HTTP handlers and the CLI
#[async_trait]
pub trait ResumeService: Send + Sync {
    async fn tailor(
        &self,
        resume_text: &str,
        job_description: &str,
        tone: Tone,
    ) -> AppResult<TailorResult>;

    /// Model name reported in response metadata
    fn model(&self) -> &str;
}

/// User prompt embedding tone, resume and job description verbatim
pub fn build_prompt(resume_text: &str, job_description: &str, tone: Tone) -> String {
    format!(
        "Tailor the following resume to better fit the job description.\n\
         Use a {tone} tone in the output.\n\
         \n\
         Resume: {resume_text}\n\
         Job Description: {job_description}\n"
    )
}

/// Production service backed by the completion client
#[derive(Debug, Clone)]
pub struct TailorService {
    client: CompletionClient,
}

impl TailorService {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResumeService for TailorService {
    async fn tailor(
        &self,
        resume_text: &str,
        job_description: &str,
        tone: Tone,
    ) -> AppResult<TailorResult> {
        debug!(
            "Tailoring resume ({} chars) against job description ({} chars) with {} tone",
            resume_text.len(),
            job_description.len(),
            tone
        );

        let prompt = build_prompt(resume_text, job_description, tone);
        let result = self.client.tailor_completion(SYSTEM_PROMPT, &prompt).await?;
        Ok(result)
    }

    fn model(&self) -> &str {
        self.client.model()
    }
}
