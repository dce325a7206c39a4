use crate::chunking::{split_documents, ChunkingConfig};
use crate::composer;
use crate::embeddings::Embedder;
use crate::error::{IngestError, QueryError};
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::ingest::load_documents;
use crate::models::{Document, IndexMode, IngestionReport, RetrievedChunk, UploadedFile};
use crate::retrieval::{mmr_select, RetrievalConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy)]
pub struct QaConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    /// Whole-call ceiling for one ingest or one ask.
    pub call_timeout: Duration,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// The pipeline context: providers, configuration, and the active index.
///
/// The index sits behind a lock and is replaced wholesale after a build, so
/// a query in flight sees either the previous index or the new one, never a
/// partially built one. `retrieve`/`ask` take `&self` and never mutate it.
pub struct QaPipeline<E, G>
where
    E: Embedder,
    G: Generator,
{
    embedder: E,
    generator: G,
    config: QaConfig,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl<E, G> QaPipeline<E, G>
where
    E: Embedder + Send + Sync,
    G: Generator + Send + Sync,
{
    pub fn new(embedder: E, generator: G) -> Self {
        Self::with_config(embedder, generator, QaConfig::default())
    }

    pub fn with_config(embedder: E, generator: G, config: QaConfig) -> Self {
        Self {
            embedder,
            generator,
            config,
            index: RwLock::new(None),
        }
    }

    /// Ingest uploaded files: extract, chunk, embed, and publish the index.
    ///
    /// Unreadable files are skipped and reported; any embedding or build
    /// failure aborts the whole batch without touching the active index.
    pub async fn ingest(
        &self,
        files: &[UploadedFile],
        mode: IndexMode,
    ) -> Result<IngestionReport, IngestError> {
        let deadline = self.config.call_timeout;
        timeout(deadline, self.ingest_inner(files, mode))
            .await
            .map_err(|_| IngestError::Timeout(deadline))?
    }

    async fn ingest_inner(
        &self,
        files: &[UploadedFile],
        mode: IndexMode,
    ) -> Result<IngestionReport, IngestError> {
        let load = load_documents(files)?;

        if load.documents.is_empty() {
            tracing::warn!(
                skipped = load.skipped_files.len(),
                "every file in the batch was skipped, index left untouched"
            );
            return Ok(IngestionReport {
                documents_indexed: 0,
                chunks_indexed: 0,
                skipped_files: load.skipped_files,
            });
        }

        let (documents_indexed, chunks_indexed) =
            self.index_documents(load.documents, mode).await?;

        tracing::info!(documents_indexed, chunks_indexed, "ingestion complete");
        Ok(IngestionReport {
            documents_indexed,
            chunks_indexed,
            skipped_files: load.skipped_files,
        })
    }

    /// Ingest documents whose text is already extracted.
    pub async fn ingest_documents(
        &self,
        documents: Vec<Document>,
        mode: IndexMode,
    ) -> Result<IngestionReport, IngestError> {
        if documents.is_empty() {
            return Err(IngestError::EmptyBatch(
                "no documents were provided for ingestion".to_string(),
            ));
        }

        let (documents_indexed, chunks_indexed) = self.index_documents(documents, mode).await?;
        Ok(IngestionReport {
            documents_indexed,
            chunks_indexed,
            skipped_files: Vec::new(),
        })
    }

    async fn index_documents(
        &self,
        documents: Vec<Document>,
        mode: IndexMode,
    ) -> Result<(usize, usize), IngestError> {
        let chunks = split_documents(&documents, self.config.chunking)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyBatch(
                "documents contained no usable text".to_string(),
            ));
        }

        let document_ids: HashSet<&str> =
            chunks.iter().map(|chunk| chunk.document_id.as_str()).collect();
        let documents_indexed = document_ids.len();
        let chunks_indexed = chunks.len();

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let fresh = VectorIndex::build(chunks, embeddings)?;

        let mut guard = self.index.write().await;
        let next = match (mode, guard.as_deref()) {
            (IndexMode::Append, Some(existing)) => {
                let mut merged = existing.clone();
                merged.absorb(fresh);
                merged
            }
            _ => fresh,
        };
        *guard = Some(Arc::new(next));

        Ok((documents_indexed, chunks_indexed))
    }

    /// Select the most relevant, non-redundant chunks for a question.
    ///
    /// An empty or missing index is a distinct `QueryError::EmptyIndex`
    /// signal, so callers can tell "nothing ingested" from "no good match".
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, QueryError> {
        let index = self.index.read().await.clone();
        let Some(index) = index else {
            return Err(QueryError::EmptyIndex);
        };

        let query_vector = self
            .embedder
            .embed(question)
            .await
            .map_err(QueryError::QueryEmbedding)?;

        let hits = index
            .search(&query_vector, self.config.retrieval.pool_size())
            .map_err(|_| QueryError::EmptyIndex)?;

        Ok(mmr_select(
            &query_vector,
            hits,
            self.config.retrieval.top_k,
            self.config.retrieval.mmr_lambda,
        ))
    }

    /// Answer a question, with failures surfaced as structured errors.
    pub async fn try_ask(&self, question: &str) -> Result<String, QueryError> {
        let deadline = self.config.call_timeout;
        timeout(deadline, self.try_ask_inner(question))
            .await
            .map_err(|_| QueryError::Timeout(deadline))?
    }

    async fn try_ask_inner(&self, question: &str) -> Result<String, QueryError> {
        let chunks = match self.retrieve(question).await {
            Ok(chunks) => chunks,
            Err(QueryError::EmptyIndex) => Vec::new(),
            Err(error) => return Err(error),
        };

        let prompt = composer::build_prompt(question, &chunks);
        self.generator
            .generate(&prompt)
            .await
            .map_err(QueryError::Generation)
    }

    /// Answer a question. Never fails: an empty index falls through to the
    /// no-context prompt and every other failure is rendered as a
    /// user-facing string.
    pub async fn ask(&self, question: &str) -> String {
        let deadline = self.config.call_timeout;
        match timeout(deadline, self.ask_inner(question)).await {
            Ok(text) => text,
            Err(_) => composer::format_query_failure(&QueryError::Timeout(deadline)),
        }
    }

    async fn ask_inner(&self, question: &str) -> String {
        let chunks = match self.retrieve(question).await {
            Ok(chunks) => chunks,
            Err(QueryError::EmptyIndex) => Vec::new(),
            Err(error) => return composer::format_query_failure(&error),
        };

        composer::answer(&self.generator, question, &chunks).await
    }

    /// Current index, if one has been built. Used for persistence.
    pub async fn index_snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.index.read().await.clone()
    }

    /// Install a previously persisted index as the active one.
    pub async fn install_index(&self, index: VectorIndex) {
        *self.index.write().await = Some(Arc::new(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::ProviderError;
    use crate::ingest::document_from_text;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            Ok(prompt.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                provider: "generator",
                status: 503,
                detail: "model unavailable".to_string(),
            })
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("too late".to_string())
        }
    }

    fn pipeline() -> QaPipeline<CharacterNgramEmbedder, EchoGenerator> {
        QaPipeline::new(CharacterNgramEmbedder::default(), EchoGenerator)
    }

    fn manual() -> Document {
        document_from_text(
            "manual.pdf",
            "The pump assembly is described first.\n\n\
             The zephyrite coupling requires a torque of 80 Nm.\n\n\
             Routine maintenance is covered in the appendix.",
        )
    }

    #[tokio::test]
    async fn ingesting_zero_files_fails() {
        let error = pipeline().ingest(&[], IndexMode::Replace).await.unwrap_err();
        assert!(matches!(error, IngestError::EmptyBatch(_)));
    }

    #[tokio::test]
    async fn batch_of_unreadable_files_reports_skips_and_builds_nothing() {
        let pipeline = pipeline();
        let files = vec![UploadedFile::new("bad.pdf", b"%PDF-1.4\n%broken".to_vec())];
        let report = pipeline.ingest(&files, IndexMode::Replace).await.unwrap();

        assert_eq!(report.chunks_indexed, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(pipeline.index_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn retrieve_finds_the_chunk_with_a_unique_keyword() {
        let pipeline = QaPipeline::with_config(
            CharacterNgramEmbedder::default(),
            EchoGenerator,
            QaConfig {
                chunking: ChunkingConfig {
                    chunk_size: 60,
                    chunk_overlap: 10,
                },
                ..QaConfig::default()
            },
        );
        pipeline
            .ingest_documents(vec![manual()], IndexMode::Replace)
            .await
            .unwrap();

        let chunks = pipeline.retrieve("zephyrite coupling torque").await.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().any(|c| c.chunk.text.contains("zephyrite")));
        assert!(chunks.iter().all(|c| c.chunk.filename == "manual.pdf"));
    }

    #[tokio::test]
    async fn retrieve_on_empty_pipeline_signals_no_context() {
        let result = pipeline().retrieve("anything").await;
        assert!(matches!(result, Err(QueryError::EmptyIndex)));
    }

    #[tokio::test]
    async fn ask_on_empty_pipeline_uses_the_no_context_prompt() {
        let answer = pipeline().ask("What is the torque?").await;
        assert!(!answer.is_empty());
        assert!(answer.contains("No relevant context was found"));
    }

    #[tokio::test]
    async fn ask_never_propagates_generation_failures() {
        let pipeline = QaPipeline::new(CharacterNgramEmbedder::default(), FailingGenerator);
        let answer = pipeline.ask("What is the torque?").await;
        assert!(answer.starts_with("Error"));
    }

    #[tokio::test]
    async fn try_ask_exposes_structured_generation_errors() {
        let pipeline = QaPipeline::new(CharacterNgramEmbedder::default(), FailingGenerator);
        let result = pipeline.try_ask("What is the torque?").await;
        assert!(matches!(result, Err(QueryError::Generation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_hits_the_call_timeout() {
        let pipeline = QaPipeline::with_config(
            CharacterNgramEmbedder::default(),
            SlowGenerator,
            QaConfig {
                call_timeout: Duration::from_secs(5),
                ..QaConfig::default()
            },
        );

        let answer = pipeline.ask("anything").await;
        assert!(answer.contains("timed out"));

        let result = pipeline.try_ask("anything").await;
        assert!(matches!(result, Err(QueryError::Timeout(_))));
    }

    #[tokio::test]
    async fn two_independent_builds_retrieve_the_same_chunk() {
        let first = pipeline();
        let second = pipeline();
        first
            .ingest_documents(vec![manual()], IndexMode::Replace)
            .await
            .unwrap();
        second
            .ingest_documents(vec![manual()], IndexMode::Replace)
            .await
            .unwrap();

        let from_first = first.retrieve("zephyrite coupling").await.unwrap();
        let from_second = second.retrieve("zephyrite coupling").await.unwrap();

        let first_ids: Vec<&str> = from_first.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
        let second_ids: Vec<&str> =
            from_second.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn append_merges_and_replace_discards() {
        let pipeline = pipeline();
        pipeline
            .ingest_documents(
                vec![document_from_text("a.pdf", "Alpha document content.")],
                IndexMode::Replace,
            )
            .await
            .unwrap();
        let after_first = pipeline.index_snapshot().await.unwrap().len();

        pipeline
            .ingest_documents(
                vec![document_from_text("b.pdf", "Bravo document content.")],
                IndexMode::Append,
            )
            .await
            .unwrap();
        assert_eq!(pipeline.index_snapshot().await.unwrap().len(), after_first + 1);

        pipeline
            .ingest_documents(
                vec![document_from_text("c.pdf", "Charlie document content.")],
                IndexMode::Replace,
            )
            .await
            .unwrap();
        assert_eq!(pipeline.index_snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn install_index_restores_a_persisted_snapshot() {
        let source = pipeline();
        source
            .ingest_documents(vec![manual()], IndexMode::Replace)
            .await
            .unwrap();
        let snapshot = source.index_snapshot().await.unwrap();

        let restored = pipeline();
        restored.install_index((*snapshot).clone()).await;
        let chunks = restored.retrieve("zephyrite coupling").await.unwrap();
        assert!(!chunks.is_empty());
    }
}
