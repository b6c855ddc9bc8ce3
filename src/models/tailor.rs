//! Resume tailoring request and response models

use crate::utils::error::{helpers::validation_error, helpers::validation_error_with, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const RESUME_MIN_CHARS: usize = 100;
pub const RESUME_MAX_CHARS: usize = 5000;
pub const JOB_MIN_CHARS: usize = 50;
pub const JOB_MAX_CHARS: usize = 2000;
pub const MIN_WORDS: usize = 10;

/// Writing style requested for the tailored resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Academic,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Casual, Tone::Academic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Academic => "academic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = crate::utils::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "academic" => Ok(Tone::Academic),
            other => Err(validation_error_with(
                format!("Invalid tone '{}'", other),
                "Use one of: professional, casual, academic",
            )),
        }
    }
}

/// JSON body of `POST /tailor`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailorRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_save_output")]
    pub save_output: bool,
}

fn default_save_output() -> bool {
    true
}

impl TailorRequest {
    /// Check length bounds and word counts, returning the request with control characters removed
    pub fn validate(self) -> AppResult<Self> {
        let resume_text = validate_text(
            "resume_text",
            &self.resume_text,
            RESUME_MIN_CHARS,
            RESUME_MAX_CHARS,
        )?;
        let job_description = validate_text(
            "job_description",
            &self.job_description,
            JOB_MIN_CHARS,
            JOB_MAX_CHARS,
        )?;

        Ok(Self {
            resume_text,
            job_description,
            ..self
        })
    }
}

fn validate_text(field: &str, text: &str, min: usize, max: usize) -> AppResult<String> {
    let length = text.chars().count();
    if length < min {
        return Err(validation_error(format!(
            "{} must be at least {} characters (got {})",
            field, min, length
        )));
    }
    if length > max {
        return Err(validation_error_with(
            format!("{} must be at most {} characters (got {})", field, max, length),
            "Shorten the text and try again",
        ));
    }

    let cleaned = strip_control_chars(text);
    let words = cleaned.split_whitespace().count();
    if words < MIN_WORDS {
        return Err(validation_error(format!(
            "{} must contain at least {} words (got {})",
            field, MIN_WORDS, words
        )));
    }

    Ok(cleaned)
}

/// Remove ASCII control characters (0x00-0x1F and 0x7F)
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{1f}' | '\u{7f}'))
        .collect()
}

/// Minimum-length checks applied to text extracted from uploaded files
pub fn validate_extracted_texts(resume_text: &str, job_text: &str) -> AppResult<()> {
    if resume_text.trim().chars().count() < RESUME_MIN_CHARS {
        return Err(validation_error_with(
            format!(
                "Resume text too short. Must be at least {} characters.",
                RESUME_MIN_CHARS
            ),
            "Upload a complete resume file",
        ));
    }

    if job_text.trim().chars().count() < JOB_MIN_CHARS {
        return Err(validation_error_with(
            format!(
                "Job description too short. Must be at least {} characters.",
                JOB_MIN_CHARS
            ),
            "Upload a complete job description",
        ));
    }

    Ok(())
}

/// Token usage and cost of one completion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

/// Tailored text plus its usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailorResult {
    pub content: String,
    pub usage: UsageRecord,
}

/// Metadata attached to every successful tailoring response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Seconds spent handling the request
    pub processing_time: f64,
    pub timestamp: String,
    pub model: String,
    pub tokens_used: u32,
    pub cost_usd: f64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_file: Option<String>,
}

/// Response body of `/tailor` and `/tailor-upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailorResponse {
    pub status: String,
    pub tailored_resume: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    pub metadata: ResponseMetadata,
}

impl TailorResponse {
    pub fn success(result: &TailorResult, model: &str, processing_time: f64) -> Self {
        Self {
            status: "success".to_string(),
            tailored_resume: result.content.clone(),
            saved_to: None,
            metadata: ResponseMetadata {
                processing_time,
                timestamp: chrono::Utc::now().to_rfc3339(),
                model: model.to_string(),
                tokens_used: result.usage.total_tokens,
                cost_usd: result.usage.cost_usd,
                input_tokens: result.usage.input_tokens,
                output_tokens: result.usage.output_tokens,
                resume_file: None,
                job_file: None,
            },
        }
    }
}
