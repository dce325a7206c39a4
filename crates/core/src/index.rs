use crate::error::IndexError;
use crate::models::DocumentChunk;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// In-memory store of (chunk, vector) pairs with exact nearest-neighbor
/// search by cosine similarity. Built once per ingestion batch; `search`
/// never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

/// One search result: the chunk, its cosine score against the query, and
/// the stored vector (kept so re-ranking can measure inter-chunk overlap).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
    pub vector: Vec<f32>,
}

impl VectorIndex {
    /// Build a fresh index from parallel chunk and embedding sequences.
    pub fn build(
        chunks: Vec<DocumentChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            return Err(IndexError::EmptyBuild);
        }

        Ok(Self {
            entries: chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, vector)| IndexEntry { chunk, vector })
                .collect(),
        })
    }

    /// Fold another index's entries into this one. Callers opt into this
    /// explicitly via `IndexMode::Append`.
    pub fn absorb(&mut self, other: VectorIndex) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `k` entries nearest to `query_vector`, highest cosine
    /// similarity first. Fewer than `k` come back if the index is smaller.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.entries.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
                vector: entry.vector.clone(),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Persist the index as JSON so it can outlive the process.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let payload = serde_json::to_vec(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let payload = fs::read(path)?;
        Ok(serde_json::from_slice(&payload)?)
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_mag: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_mag: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();

    if left_mag == 0.0 || right_mag == 0.0 {
        return 0.0;
    }
    dot / (left_mag * right_mag)
}
