use crate::error::IngestError;
use crate::models::{Document, DocumentChunk};
use sha2::{Digest, Sha256};

/// Break points are searched in this order; raw character boundaries are the
/// fallback when a window contains none of them.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_200,
            chunk_overlap: 150,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split one document's text into overlapping pieces, returning each piece
/// with its char offset into the original text.
///
/// Windows are cut as close to `chunk_size` as possible without exceeding it,
/// preferring to break after a paragraph, line, sentence, or word boundary in
/// that order. Consecutive pieces overlap by exactly `chunk_overlap`
/// characters; the final piece may be shorter and carries no trailing overlap.
pub fn split_text_spans(text: &str, config: ChunkingConfig) -> Vec<(usize, String)> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.chunk_size {
        return vec![(0, text.to_string())];
    }

    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + config.chunk_size).min(chars.len());
        if hard_end == chars.len() {
            spans.push((start, chars[start..].iter().collect()));
            break;
        }

        // Any break must leave room for the overlap to make forward progress.
        let min_end = start + config.chunk_overlap + 1;
        let end = preferred_break(&chars, min_end, hard_end).unwrap_or(hard_end);
        spans.push((start, chars[start..end].iter().collect()));
        start = end - config.chunk_overlap;
    }

    spans
}

pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    split_text_spans(text, config)
        .into_iter()
        .map(|(_, piece)| piece)
        .collect()
}

/// Find the latest break position in `[min_end, max_end]`, trying each
/// separator in priority order. A break lands just after the separator, so
/// the separator stays with the preceding chunk.
fn preferred_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    if min_end > max_end {
        return None;
    }

    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        if sep.len() > max_end {
            continue;
        }

        let highest = max_end - sep.len();
        let lowest = min_end.saturating_sub(sep.len());

        let mut position = highest;
        loop {
            if chars[position..position + sep.len()] == sep[..] {
                let end = position + sep.len();
                if end >= min_end {
                    return Some(end);
                }
            }
            if position == lowest {
                break;
            }
            position -= 1;
        }
    }

    None
}

/// Split a batch of documents into chunks with stable identities. Documents
/// that produce no text are skipped; chunks never span a document boundary.
pub fn split_documents(
    documents: &[Document],
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, IngestError> {
    config.validate()?;

    let mut chunks = Vec::new();
    for document in documents {
        let spans = split_text_spans(&document.text, config);
        if spans.is_empty() {
            tracing::warn!(
                filename = %document.fingerprint.filename,
                "document produced no chunks, skipping"
            );
            continue;
        }

        for (index, (char_offset, text)) in spans.into_iter().enumerate() {
            let chunk_index = index as u64;
            chunks.push(DocumentChunk {
                chunk_id: make_chunk_id(&document.fingerprint.document_id, chunk_index, &text),
                document_id: document.fingerprint.document_id.clone(),
                filename: document.fingerprint.filename.clone(),
                chunk_index,
                char_offset,
                text,
            });
        }
    }

    Ok(chunks)
}

fn make_chunk_id(document_id: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
