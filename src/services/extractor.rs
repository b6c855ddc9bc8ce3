//! Plain-text extraction from uploaded PDF, DOCX and TXT files

use crate::utils::error::{AppError, AppResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Docx,
    Txt,
}

pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];

impl FileFormat {
    /// Detect the format from the file extension, case-insensitively
    pub fn from_filename(filename: &str) -> AppResult<Self> {
        let extension = file_extension(filename);
        match extension.as_str() {
            ".pdf" => Ok(FileFormat::Pdf),
            ".docx" => Ok(FileFormat::Docx),
            ".txt" => Ok(FileFormat::Txt),
            _ => Err(AppError::UnsupportedFileType(if extension.is_empty() {
                "(none)".to_string()
            } else {
                extension
            })),
        }
    }
}

/// Lowercased extension including the leading dot, or an empty string
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Extract plain text from file bytes, choosing the parser by extension
pub fn extract_text(bytes: &[u8], filename: &str) -> AppResult<String> {
    let format = FileFormat::from_filename(filename)?;
    debug!("Extracting text from {} as {:?} ({} bytes)", filename, format, bytes.len());

    let text = match format {
        FileFormat::Pdf => extract_pdf(bytes)?,
        FileFormat::Docx => extract_docx(bytes)?,
        FileFormat::Txt => extract_txt(bytes)?,
    };

    Ok(text.trim().to_string())
}

fn extract_pdf(bytes: &[u8]) -> AppResult<String> {
    // pdf-extract panics on some malformed documents
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match outcome {
        Ok(Ok(text)) => Ok(text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")),
        Ok(Err(e)) => Err(AppError::Extraction(format!("could not read PDF: {}", e))),
        Err(_) => Err(AppError::Extraction("could not read PDF: malformed document".to_string())),
    }
}

fn extract_docx(bytes: &[u8]) -> AppResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Extraction(format!("could not open DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Extraction(format!("DOCX has no document body: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Extraction(format!("could not read DOCX body: {}", e)))?;

    docx_paragraphs(&xml)
        .map(|paragraphs| paragraphs.join("\n"))
        .map_err(|e| AppError::Extraction(format!("invalid DOCX XML: {}", e)))
}

/// Text of the top-level `w:p` paragraphs of a WordprocessingML body
///
/// Paragraphs nested in tables, text boxes or other containers are skipped.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut body_depth = None;
    let mut paragraph_depth = None;
    let mut nested_paragraphs = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"w:body" => body_depth = Some(depth),
                    b"w:p" if paragraph_depth.is_some() => nested_paragraphs += 1,
                    b"w:p" if body_depth.map(|body| body + 1) == Some(depth) => {
                        paragraph_depth = Some(depth);
                        current.clear();
                    }
                    b"w:t" => in_text = paragraph_depth.is_some() && nested_paragraphs == 0,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let in_paragraph = paragraph_depth.is_some() && nested_paragraphs == 0;
                match e.name().as_ref() {
                    b"w:p" if paragraph_depth.is_none() && body_depth == Some(depth) => {
                        paragraphs.push(String::new())
                    }
                    b"w:tab" if in_paragraph => current.push('\t'),
                    b"w:br" | b"w:cr" if in_paragraph => current.push('\n'),
                    _ => {}
                }
            }
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => {
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" if nested_paragraphs > 0 => nested_paragraphs -= 1,
                    b"w:p" if paragraph_depth == Some(depth) => {
                        paragraph_depth = None;
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    b"w:body" => body_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn extract_txt(bytes: &[u8]) -> AppResult<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::Extraction(format!("text file is not valid UTF-8: {}", e)))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}
