//! Resume tailoring handlers
//!
//! JSON and multipart entry points in front of the tailoring service

use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::tailor::{validate_extracted_texts, TailorRequest, TailorResponse, TailorResult, Tone};
use crate::services::extractor::{extract_text, FileFormat};
use crate::services::output::save_output;
use crate::utils::error::{
    helpers::{internal_error, validation_error, validation_error_with},
    AppError, AppResult, CorrelatedError,
};
use crate::utils::logging::request_log_summary;
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    Extension, Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Handle JSON tailoring requests
///
/// POST /tailor
pub async fn handle_tailor(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<TailorRequest>, JsonRejection>,
) -> Result<Json<TailorResponse>, CorrelatedError> {
    let started = Instant::now();
    let correlation_id = correlation_id(request_id);

    let result: AppResult<TailorResponse> = async {
        let Json(request) = payload.map_err(|rejection| {
            validation_error_with(
                rejection.body_text(),
                "Send a JSON body with resume_text and job_description",
            )
        })?;
        let request = request.validate()?;
        debug!("Tailor request: {}", request_log_summary(&request));

        let tailored = state
            .service
            .tailor(&request.resume_text, &request.job_description, request.tone)
            .await?;

        respond(&state, &tailored, request.save_output, started).await
    }
    .await;

    result.map(Json).map_err(|e| correlate(e, correlation_id))
}

/// Handle file upload tailoring requests
///
/// POST /tailor-upload with multipart fields `Resume`, `JD`, `Tone` and `Save`
pub async fn handle_tailor_upload(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TailorResponse>, CorrelatedError> {
    let started = Instant::now();
    let correlation_id = correlation_id(request_id);

    let result: AppResult<TailorResponse> = async {
        let multipart = multipart.map_err(|rejection| {
            validation_error_with(rejection.body_text(), "Send a multipart/form-data body")
        })?;
        let form = UploadForm::read(multipart).await?;
        let (resume_name, resume_bytes) = form
            .resume
            .ok_or_else(|| validation_error("Missing required file field 'Resume'"))?;
        let (job_name, job_bytes) = form
            .job
            .ok_or_else(|| validation_error("Missing required file field 'JD'"))?;

        info!(
            "Upload request: resume={} ({} bytes), job={} ({} bytes), tone={}",
            resume_name,
            resume_bytes.len(),
            job_name,
            job_bytes.len(),
            form.tone
        );

        let resume_text = extract_blocking(resume_bytes, resume_name.clone()).await?;
        let job_text = extract_blocking(job_bytes, job_name.clone()).await?;
        validate_extracted_texts(&resume_text, &job_text)?;

        let tailored = state.service.tailor(&resume_text, &job_text, form.tone).await?;

        let mut response = respond(&state, &tailored, form.save, started).await?;
        response.metadata.resume_file = Some(resume_name);
        response.metadata.job_file = Some(job_name);
        Ok(response)
    }
    .await;

    result.map(Json).map_err(|e| correlate(e, correlation_id))
}

/// Parsed multipart upload
#[derive(Debug)]
struct UploadForm {
    resume: Option<(String, Vec<u8>)>,
    job: Option<(String, Vec<u8>)>,
    tone: Tone,
    save: bool,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm {
            resume: None,
            job: None,
            tone: Tone::default(),
            save: true,
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| validation_error(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "Resume" => form.resume = Some(read_file(field, "Resume").await?),
                "JD" => form.job = Some(read_file(field, "Job description").await?),
                "Tone" => form.tone = parse_tone_field(&read_text(field).await?)?,
                "Save" => form.save = parse_save_flag(&read_text(field).await?)?,
                other => debug!("Ignoring unknown multipart field '{}'", other),
            }
        }

        Ok(form)
    }
}

/// Read a file field, rejecting unsupported extensions before the body is buffered
async fn read_file(field: Field<'_>, label: &str) -> AppResult<(String, Vec<u8>)> {
    let filename = field.file_name().unwrap_or_default().to_string();
    if let Err(AppError::UnsupportedFileType(ext)) = FileFormat::from_filename(&filename) {
        return Err(validation_error_with(
            format!("{} file type {} not supported. Use PDF, DOCX, or TXT.", label, ext),
            "Upload a file with .pdf, .docx, or .txt extension",
        ));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| validation_error(format!("Failed to read {} file: {}", label, e)))?;
    Ok((filename, bytes.to_vec()))
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| validation_error(format!("Invalid form field: {}", e)))
}

/// An empty `Tone` field falls back to the default tone
fn parse_tone_field(value: &str) -> AppResult<Tone> {
    if value.trim().is_empty() {
        return Ok(Tone::default());
    }
    value.parse()
}

fn parse_save_flag(value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(validation_error(format!("Invalid Save value '{}'", other))),
    }
}

/// PDF parsing is CPU bound, keep it off the async workers
async fn extract_blocking(bytes: Vec<u8>, filename: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, &filename))
        .await
        .map_err(|e| internal_error(format!("Text extraction task failed: {}", e)))?
}

/// Build the success body, persisting the output when asked to
async fn respond(
    state: &AppState,
    tailored: &TailorResult,
    save: bool,
    started: Instant,
) -> AppResult<TailorResponse> {
    let saved_to = if save {
        let path = save_output(&state.settings.storage.output_dir, &tailored.content).await?;
        Some(path.display().to_string())
    } else {
        None
    };

    let mut response =
        TailorResponse::success(tailored, state.service.model(), started.elapsed().as_secs_f64());
    response.saved_to = saved_to;

    info!(
        tokens = response.metadata.tokens_used,
        cost_usd = response.metadata.cost_usd,
        "Tailoring completed in {:.2}s",
        response.metadata.processing_time
    );

    Ok(response)
}

fn correlation_id(request_id: Option<Extension<RequestId>>) -> Option<String> {
    request_id.map(|Extension(id)| id.0)
}

fn correlate(error: AppError, correlation_id: Option<String>) -> CorrelatedError {
    CorrelatedError {
        error,
        correlation_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save_flag() {
        assert!(parse_save_flag("true").unwrap());
        assert!(parse_save_flag("").unwrap());
        assert!(!parse_save_flag("False").unwrap());
        assert!(!parse_save_flag("0").unwrap());
        assert!(parse_save_flag("maybe").is_err());
    }

    #[test]
    fn test_parse_tone_field() {
        assert_eq!(parse_tone_field("").unwrap(), Tone::Professional);
        assert_eq!(parse_tone_field("  ").unwrap(), Tone::Professional);
        assert_eq!(parse_tone_field("Casual").unwrap(), Tone::Casual);
        assert!(parse_tone_field("sarcastic").is_err());
    }
}
