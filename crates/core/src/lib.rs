mod backoff;
pub mod chunking;
pub mod composer;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retrieval;

pub use chunking::{split_documents, split_text, ChunkingConfig};
pub use composer::{answer, build_prompt};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IndexError, IngestError, ProviderError, QueryError};
pub use extractor::{extract_pdf_text, LopdfExtractor, PdfExtractor};
pub use generation::{
    Generator, GroqGenerator, DEFAULT_GENERATION_ENDPOINT, DEFAULT_GENERATION_MODEL,
};
pub use index::{SearchHit, VectorIndex};
pub use ingest::{
    discover_pdf_files, document_from_text, load_documents, load_uploads_from_dir, LoadReport,
};
pub use models::{
    Document, DocumentChunk, DocumentFingerprint, IndexMode, IngestionReport, RetrievedChunk,
    SkippedFile, UploadedFile,
};
pub use orchestrator::{QaConfig, QaPipeline};
pub use retrieval::{mmr_select, RetrievalConfig};
