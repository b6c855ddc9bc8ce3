//! Text extraction tests

use resume_tailor::services::extractor::{extract_text, FileFormat, SUPPORTED_EXTENSIONS};
use resume_tailor::AppError;
use std::io::{Cursor, Write};

fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_txt_round_trip() {
    let text = extract_text(b"Hello World", "resume.txt").unwrap();
    assert_eq!(text, "Hello World");
}

#[test]
fn test_txt_is_trimmed_and_bom_removed() {
    let text = extract_text("\u{feff}  Hello World \n\n".as_bytes(), "notes.TXT").unwrap();
    assert_eq!(text, "Hello World");
}

#[test]
fn test_exe_is_unsupported() {
    match extract_text(b"MZ", "setup.exe") {
        Err(AppError::UnsupportedFileType(ext)) => assert_eq!(ext, ".exe"),
        other => panic!("expected unsupported file type, got {:?}", other),
    }
}

#[test]
fn test_supported_extensions() {
    for ext in SUPPORTED_EXTENSIONS {
        assert!(FileFormat::from_filename(&format!("file{}", ext)).is_ok());
    }
    assert!(FileFormat::from_filename("archive.doc").is_err());
}

#[test]
fn test_docx_paragraphs_joined_with_newlines() {
    let bytes = build_docx(&["Jane Doe", "Senior Engineer", "Rust &amp; Go"]);

    let text = extract_text(&bytes, "resume.docx").unwrap();

    assert_eq!(text, "Jane Doe\nSenior Engineer\nRust & Go");
}

#[test]
fn test_corrupt_docx_is_extraction_error() {
    assert!(matches!(
        extract_text(b"definitely not a zip archive", "resume.docx"),
        Err(AppError::Extraction(_))
    ));
}

#[test]
fn test_corrupt_pdf_is_extraction_error() {
    assert!(matches!(
        extract_text(b"%PDF-1.4 truncated", "resume.pdf"),
        Err(AppError::Extraction(_))
    ));
}
