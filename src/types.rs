//! Shared error type for the ingestion and query pipelines.

use thiserror::Error;

/// Errors surfaced by the pipeline stages.
///
/// Most variants wrap a provider or library error as a string; the pipeline
/// does not branch on failure causes beyond logging them, so the message is
/// the payload that matters.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source document could not be parsed or yielded no usable text.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The embedding provider rejected or failed a request.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The chat model rejected or failed a completion request.
    #[error("completion failed: {0}")]
    Completion(String),

    /// The vector store could not be opened, written, or queried.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure while reading the corpus or persisting state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure for metadata or persisted state.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
