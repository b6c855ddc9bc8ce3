//! Persistence of tailored resumes

use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Prefix of every saved output file
pub const OUTPUT_PREFIX: &str = "tailored_resume_";

/// Give up after this many same-second collisions
const MAX_SUFFIX: u32 = 1000;

/// `tailored_resume_<YYYYMMDD_HHMMSS>[_<n>].txt`
pub fn output_file_name(timestamp: &DateTime<Local>, suffix: u32) -> String {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    if suffix == 0 {
        format!("{}{}.txt", OUTPUT_PREFIX, stamp)
    } else {
        format!("{}{}_{}.txt", OUTPUT_PREFIX, stamp, suffix)
    }
}

/// Write the tailored text under `output_dir`, creating the directory if needed.
///
/// Files are created exclusively; when a file for the same second already
/// exists a numeric suffix is appended instead of overwriting it.
pub async fn save_output(output_dir: &Path, content: &str) -> std::io::Result<PathBuf> {
    save_output_at(output_dir, content, Local::now()).await
}

pub async fn save_output_at(
    output_dir: &Path,
    content: &str,
    timestamp: DateTime<Local>,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(output_dir).await?;

    for suffix in 0..=MAX_SUFFIX {
        let path = output_dir.join(output_file_name(&timestamp, suffix));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                file.write_all(content.as_bytes()).await?;
                file.flush().await?;
                info!("Saved tailored resume to {}", path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free output file name in {}", output_dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 11, 5, 14, 3, 9).unwrap()
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(&fixed_time(), 0), "tailored_resume_20241105_140309.txt");
        assert_eq!(output_file_name(&fixed_time(), 2), "tailored_resume_20241105_140309_2.txt");
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("output");

        let path = save_output_at(&dir, "Tailored", fixed_time()).await.unwrap();

        assert_eq!(path, dir.join("tailored_resume_20241105_140309.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Tailored");
    }

    #[tokio::test]
    async fn test_same_second_saves_do_not_overwrite() {
        let temp = tempfile::tempdir().unwrap();

        let first = save_output_at(temp.path(), "first", fixed_time()).await.unwrap();
        let second = save_output_at(temp.path(), "second", fixed_time()).await.unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("tailored_resume_20241105_140309_1.txt"));
        assert_eq!(std::fs::read_to_string(first).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "second");
    }
}
