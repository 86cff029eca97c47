//! Vector storage for policy fragments.
//!
//! [`FragmentStore`] is the backend-agnostic interface the ingestion
//! pipeline writes through; [`sqlite::SqliteFragmentStore`] is the shipped
//! implementation, backed by `sqlite-vec` through `rig-sqlite`. The index
//! is a single local SQLite file, so "persist" is just the database living
//! on disk.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

pub use sqlite::{FragmentDocument, SqliteFragmentStore};

/// A fragment with its embedding, ready for storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FragmentRecord {
    /// Unique fragment id.
    pub id: String,
    /// Corpus-relative path of the source document.
    pub source: String,
    /// Title of the source document.
    pub title: String,
    /// Zero-based position of this fragment within the source.
    pub fragment_index: usize,
    /// Fragment text.
    pub content: String,
    /// Additional metadata as JSON.
    pub metadata: serde_json::Value,
    /// Embedding vector, when computed.
    pub embedding: Option<Vec<f32>>,
}

impl FragmentRecord {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        title: impl Into<String>,
        fragment_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            title: title.into(),
            fragment_index,
            content: content.into(),
            metadata: serde_json::Value::Object(Default::default()),
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

impl From<FragmentRecord> for FragmentDocument {
    fn from(record: FragmentRecord) -> Self {
        FragmentDocument {
            id: record.id,
            source: record.source,
            title: record.title,
            fragment_index: record.fragment_index,
            content: record.content,
            metadata: record.metadata,
        }
    }
}

impl From<FragmentDocument> for FragmentRecord {
    fn from(doc: FragmentDocument) -> Self {
        FragmentRecord {
            id: doc.id,
            source: doc.source,
            title: doc.title,
            fragment_index: doc.fragment_index,
            content: doc.content,
            metadata: doc.metadata,
            embedding: None,
        }
    }
}

/// Backend-agnostic interface for fragment storage.
///
/// Records without embeddings are skipped on insert; the store only holds
/// searchable fragments.
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Insert fragment records, pairing each with its embedding.
    async fn insert_fragments(&self, fragments: Vec<FragmentRecord>) -> Result<(), PipelineError>;

    /// All fragments of one source document, in index order.
    async fn fragments_by_source(&self, source: &str)
    -> Result<Vec<FragmentRecord>, PipelineError>;

    /// Remove every fragment of a source document; returns how many.
    async fn delete_by_source(&self, source: &str) -> Result<usize, PipelineError>;

    /// Cosine similarity search, most similar first, capped at `top_k`.
    /// The score is `1.0 - distance`.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(FragmentRecord, f32)>, PipelineError>;

    /// Total number of stored fragments.
    async fn count(&self) -> Result<usize, PipelineError>;
}
