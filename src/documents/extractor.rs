// src/documents/extractor.rs
//! Best-effort plain text from stored files (PDF, DOCX, anything else as UTF-8)

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::{DocumentRepository, DocumentType};

const MEDIA_PREFIX: &str = "/media/";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {}: {source}", .path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("failed to parse DOCX {}: {message}", .path.display())]
    Docx { path: PathBuf, message: String },

    #[error("extraction task aborted: {0}")]
    Task(String),
}

/// Map a stored reference (`/media/...`, `http://host/media/...` or a bare
/// relative path) onto a file under `media_root`.
pub fn resolve_file_location(media_root: &Path, reference: &str) -> PathBuf {
    let relative = match reference.split_once(MEDIA_PREFIX) {
        Some((_, rest)) => rest,
        None => reference.trim_start_matches('/'),
    };
    media_root.join(relative)
}

/// Extract text, reporting why it failed
pub fn try_extract_text(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => read_pdf(path),
        Some("docx") => read_docx(path),
        _ => read_plain(path),
    }
}

/// Extract text from a stored file reference. Never fails: any problem is
/// logged and yields an empty string.
pub async fn extract_text(media_root: &Path, reference: &str) -> String {
    let path = resolve_file_location(media_root, reference);
    let task_path = path.clone();

    let outcome = tokio::task::spawn_blocking(move || try_extract_text(&task_path))
        .await
        .unwrap_or_else(|e| Err(ExtractError::Task(e.to_string())));

    match outcome {
        Ok(text) => text,
        Err(e) => {
            warn!("Text extraction failed for {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Text of the most recently uploaded CV, trimmed line by line with blank
/// lines dropped. `None` when there is no CV or nothing readable in it.
pub async fn latest_cv_text(pool: &SqlitePool, media_root: &Path) -> Result<Option<String>> {
    let Some(cv) = DocumentRepository::new(pool)
        .latest(DocumentType::Cv)
        .await?
    else {
        debug!("No CV document uploaded");
        return Ok(None);
    };

    let Some(file_url) = cv.file_url() else {
        debug!("Latest CV #{} has no file attached", cv.id);
        return Ok(None);
    };

    let text = clean_lines(&extract_text(media_root, &file_url).await);
    Ok(if text.is_empty() { None } else { Some(text) })
}

pub fn clean_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_pdf(path: &Path) -> Result<String, ExtractError> {
    let document = lopdf::Document::load(path).map_err(|source| ExtractError::Pdf {
        path: path.to_path_buf(),
        source,
    })?;

    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|page_number| {
            document.extract_text(&[*page_number]).unwrap_or_else(|e| {
                debug!("Skipping unreadable page {} of {}: {}", page_number, path.display(), e);
                String::new()
            })
        })
        .collect();

    Ok(pages.join("\n"))
}

fn read_docx(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let docx = docx_rs::read_docx(&bytes).map_err(|e| ExtractError::Docx {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            let mut text = String::new();
            for paragraph_child in &paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = paragraph_child {
                    for run_child in &run.children {
                        match run_child {
                            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                            docx_rs::RunChild::Tab(_) => text.push('\t'),
                            docx_rs::RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

fn read_plain(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_utf8_dropping_invalid(&bytes))
}

/// UTF-8 decode that skips undecodable bytes instead of substituting them
fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::documents::NewDocument;

    #[test]
    fn resolves_media_urls_and_bare_paths() {
        let root = Path::new("/srv/media");

        assert_eq!(
            resolve_file_location(root, "/media/uploads/2024/01/01/cv_a.pdf"),
            PathBuf::from("/srv/media/uploads/2024/01/01/cv_a.pdf")
        );
        assert_eq!(
            resolve_file_location(root, "http://127.0.0.1:8000/media/uploads/cv_b.docx"),
            PathBuf::from("/srv/media/uploads/cv_b.docx")
        );
        assert_eq!(
            resolve_file_location(root, "/uploads/cv_c.txt"),
            PathBuf::from("/srv/media/uploads/cv_c.txt")
        );
    }

    #[test]
    fn invalid_utf8_bytes_are_dropped() {
        let bytes = b"Senior \xff\xfeEngineer\n\xc3\xa9t\xc3\xa9";
        assert_eq!(decode_utf8_dropping_invalid(bytes), "Senior Engineer\nété");
    }

    #[test]
    fn clean_lines_trims_and_drops_blanks() {
        let text = "  Jane Doe  \n\n\t\nSenior Software Engineer \r\n   Location: Pune\n";
        assert_eq!(
            clean_lines(text),
            "Jane Doe\nSenior Software Engineer\nLocation: Pune"
        );
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = try_extract_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn corrupt_pdf_reports_pdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.PDF");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = try_extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf { .. }));
    }

    #[test]
    fn corrupt_docx_reports_docx_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK but not really").unwrap();

        let err = try_extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Docx { .. }));
    }

    #[tokio::test]
    async fn extract_text_swallows_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();

        assert_eq!(extract_text(dir.path(), "/media/missing.txt").await, "");
        assert_eq!(extract_text(dir.path(), "/media/broken.pdf").await, "");
    }

    #[tokio::test]
    async fn plain_text_is_read_from_media_root() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join("cv_notes.md"), "Data Analyst\nMumbai").unwrap();

        let text = extract_text(dir.path(), "/media/uploads/cv_notes.md").await;
        assert_eq!(text, "Data Analyst\nMumbai");
    }

    #[tokio::test]
    async fn latest_cv_text_handles_missing_and_blank_cvs() {
        let db = Database::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = DocumentRepository::new(db.pool());

        assert_eq!(latest_cv_text(db.pool(), dir.path()).await.unwrap(), None);

        std::fs::write(dir.path().join("blank.txt"), "  \n\n   \n").unwrap();
        repo.create(&NewDocument {
            doc_type: DocumentType::Cv,
            file_path: Some("blank.txt".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(latest_cv_text(db.pool(), dir.path()).await.unwrap(), None);

        std::fs::write(dir.path().join("cv.txt"), " Jane \n\n Backend Developer \n").unwrap();
        repo.create(&NewDocument {
            doc_type: DocumentType::Cv,
            file_path: Some("cv.txt".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(
            latest_cv_text(db.pool(), dir.path()).await.unwrap().as_deref(),
            Some("Jane\nBackend Developer")
        );
    }
}
