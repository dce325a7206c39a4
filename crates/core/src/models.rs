use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of an uploaded document, computed once at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub filename: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// A loaded document: extracted text plus its fingerprint. Documents are
/// immutable and live only for the duration of one ingestion pass.
#[derive(Debug, Clone)]
pub struct Document {
    pub fingerprint: DocumentFingerprint,
    pub text: String,
}

/// A bounded segment of one document's text, the unit of embedding and
/// retrieval. Never spans a document boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub filename: String,
    /// Zero-based position of this chunk within its document.
    pub chunk_index: u64,
    /// Char offset of the chunk's first character within the document text.
    pub char_offset: usize,
    pub text: String,
}

/// A chunk selected for a query, with its relevance score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Raw upload: filename plus file bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// A document that could not be ingested, with the reason it was skipped.
#[derive(Debug)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one ingestion batch.
#[derive(Debug)]
pub struct IngestionReport {
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
    pub skipped_files: Vec<SkippedFile>,
}

/// Whether a new ingestion batch replaces the active index or is merged
/// into it. Merging is always explicit; there is no silent default append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Replace,
    Append,
}
