use std::time::Duration;
use thiserror::Error;

/// Failure talking to an external embedding or generation service.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {detail}")]
    Api {
        provider: &'static str,
        status: u16,
        detail: String,
    },

    #[error("invalid response from {provider}: {detail}")]
    Response {
        provider: &'static str,
        detail: String,
    },

    #[error("missing api key for {0}")]
    MissingApiKey(&'static str),
}

impl ProviderError {
    /// Transient failures worth retrying: transport errors, rate limits,
    /// server-side 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(error) => error.is_timeout() || error.is_connect(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("nothing to ingest: {0}")]
    EmptyBatch(String),

    #[error("embedding failed during ingestion: {0}")]
    Embedding(#[from] ProviderError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("ingestion timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("chunk count {chunks} does not match embedding count {embeddings}")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("cannot build an index from zero entries")]
    EmptyBuild,

    #[error("index holds no entries")]
    EmptyIndex,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query embedding failed: {0}")]
    QueryEmbedding(ProviderError),

    #[error("no context available: no documents have been indexed")]
    EmptyIndex,

    #[error("generation failed: {0}")]
    Generation(ProviderError),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
