use crate::error::IngestError;
use crate::extractor::extract_pdf_text;
use crate::models::{Document, DocumentFingerprint, SkippedFile, UploadedFile};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Documents that loaded cleanly plus the files that had to be skipped.
/// Skips are reported, never silently dropped.
#[derive(Debug)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Load a batch of uploads into documents, best effort. A file that fails
/// extraction or carries no text is recorded as skipped; an empty batch is
/// an error because no index could come out of it.
pub fn load_documents(files: &[UploadedFile]) -> Result<LoadReport, IngestError> {
    if files.is_empty() {
        return Err(IngestError::EmptyBatch(
            "no files were provided for ingestion".to_string(),
        ));
    }

    let mut documents = Vec::new();
    let mut skipped_files = Vec::new();

    for file in files {
        match extract_pdf_text(&file.filename, &file.bytes) {
            Ok(text) => documents.push(Document {
                fingerprint: make_fingerprint(&file.filename, &file.bytes),
                text,
            }),
            Err(error) => {
                tracing::warn!(filename = %file.filename, reason = %error, "skipping file");
                skipped_files.push(SkippedFile {
                    filename: file.filename.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(LoadReport {
        documents,
        skipped_files,
    })
}

/// Build a document directly from already-extracted text. Used by callers
/// that hold plain text rather than PDF bytes.
pub fn document_from_text(filename: &str, text: impl Into<String>) -> Document {
    let text = text.into();
    Document {
        fingerprint: make_fingerprint(filename, text.as_bytes()),
        text,
    }
}

/// Recursively discover PDF files under a folder, sorted for determinism.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Read every PDF under `folder` into upload form, ready for ingestion.
pub async fn load_uploads_from_dir(folder: &Path) -> Result<Vec<UploadedFile>, IngestError> {
    let paths = discover_pdf_files(folder);
    if paths.is_empty() {
        return Err(IngestError::EmptyBatch(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path).await?;
        files.push(UploadedFile::new(path.to_string_lossy(), bytes));
    }

    Ok(files)
}

fn make_fingerprint(filename: &str, bytes: &[u8]) -> DocumentFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let checksum = format!("{:x}", hasher.finalize());

    let mut id_hasher = Sha256::new();
    id_hasher.update(filename.as_bytes());

    DocumentFingerprint {
        document_id: format!("{:x}", id_hasher.finalize()),
        filename: filename.to_string(),
        checksum,
        ingested_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn zero_files_is_an_empty_batch_error() {
        let error = load_documents(&[]).unwrap_err();
        assert!(matches!(error, IngestError::EmptyBatch(_)));
    }

    #[test]
    fn unreadable_files_are_skipped_with_reason() {
        let files = vec![UploadedFile::new("bad.pdf", b"%PDF-1.4\n%broken".to_vec())];
        let report = load_documents(&files).unwrap();

        assert!(report.documents.is_empty());
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].filename, "bad.pdf");
        assert!(!report.skipped_files[0].reason.is_empty());
    }

    #[test]
    fn fingerprints_are_deterministic() {
        let first = document_from_text("manual.pdf", "pump schedule");
        let second = document_from_text("manual.pdf", "pump schedule");
        assert_eq!(
            first.fingerprint.document_id,
            second.fingerprint.document_id
        );
        assert_eq!(first.fingerprint.checksum, second.fingerprint.checksum);
    }

    #[test]
    fn discover_pdf_files_is_recursive_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(nested.join("b.pdf")).and_then(|mut f| f.write_all(b"%PDF-1.4"))?;
        File::create(base.join("a.pdf")).and_then(|mut f| f.write_all(b"%PDF-1.4"))?;
        File::create(base.join("notes.txt")).and_then(|mut f| f.write_all(b"skip me"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.pdf"));
        assert!(files[1].ends_with("nested/b.pdf"));
        Ok(())
    }

    #[tokio::test]
    async fn folder_without_pdfs_is_an_empty_batch_error() {
        let dir = tempdir().unwrap();
        let error = load_uploads_from_dir(dir.path()).await.unwrap_err();
        assert!(matches!(error, IngestError::EmptyBatch(_)));
    }
}
