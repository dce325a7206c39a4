use crate::error::{ProviderError, QueryError};
use crate::generation::Generator;
use crate::models::RetrievedChunk;

const CONTEXT_PREAMBLE: &str =
    "You are a helpful assistant. Use the following context to answer the user's question.";

const NO_CONTEXT_PREAMBLE: &str = "You are a helpful assistant. No relevant context was found \
in the uploaded documents. Answer from general knowledge, or say that you do not know.";

const UNAVAILABLE_MESSAGE: &str =
    "Error: The answer service is currently unavailable. Please try again later.";

/// Assemble the deterministic prompt: preamble, retrieved context annotated
/// with source filenames, the literal question, an answer cue. The same
/// question and chunks always produce the same prompt.
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return format!("{NO_CONTEXT_PREAMBLE}\n\nQuestion: {question}\nAnswer:");
    }

    let context = chunks
        .iter()
        .map(|retrieved| {
            format!(
                "[source: {}]\n{}",
                retrieved.chunk.filename, retrieved.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{CONTEXT_PREAMBLE}\n\nContext:\n{context}\n\nQuestion: {question}\nAnswer:")
}

/// Generate an answer grounded in the retrieved chunks. Always returns a
/// non-empty string; generation failures come back as user-facing text,
/// never as an error.
pub async fn answer<G: Generator>(
    generator: &G,
    question: &str,
    chunks: &[RetrievedChunk],
) -> String {
    let prompt = build_prompt(question, chunks);
    match generator.generate(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::error!("generator returned an empty completion");
            UNAVAILABLE_MESSAGE.to_string()
        }
        Err(error) => {
            tracing::error!(error = %error, "generation failed");
            format_generation_failure(&error)
        }
    }
}

/// Map a provider failure to a user-facing message that names the failure
/// class without exposing internals.
pub fn format_generation_failure(error: &ProviderError) -> String {
    match error {
        ProviderError::Http(_) | ProviderError::Api { .. } => UNAVAILABLE_MESSAGE.to_string(),
        ProviderError::MissingApiKey(_) => {
            "Error: No API key is configured for the answer service.".to_string()
        }
        ProviderError::Response { .. } => {
            "Error processing your request: the answer service returned an invalid response."
                .to_string()
        }
    }
}

/// User-facing rendering for failures on the query path.
pub fn format_query_failure(error: &QueryError) -> String {
    match error {
        QueryError::Generation(provider) => format_generation_failure(provider),
        QueryError::QueryEmbedding(_) => {
            "Error processing your request: the question could not be embedded.".to_string()
        }
        QueryError::EmptyIndex => {
            "No documents have been ingested yet. Upload documents before asking.".to_string()
        }
        QueryError::Timeout(_) => "Error: The request timed out. Please try again.".to_string(),
    }
}
