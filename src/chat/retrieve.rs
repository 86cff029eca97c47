//! Similarity retrieval over the fragment index.

use rig::embeddings::EmbeddingModel;
use rig::vector_store::VectorStoreIndex;
use rig::vector_store::request::VectorSearchRequest;
use tracing::debug;

use crate::stores::sqlite::{FragmentDocument, SqliteFragmentStore};
use crate::types::PipelineError;

/// A fragment returned by retrieval, with its source attribution and the
/// index's relevance score.
#[derive(Clone, Debug)]
pub struct RetrievedFragment {
    pub source: String,
    pub title: String,
    pub fragment_index: usize,
    pub content: String,
    pub score: f64,
}

/// Embeds the query and runs top-k search against the sqlite-vec index.
pub struct Retriever<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    store: SqliteFragmentStore<E>,
    model: E,
    top_k: usize,
}

impl<E> Retriever<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    pub fn new(store: SqliteFragmentStore<E>, model: E, top_k: usize) -> Self {
        Self {
            store,
            model,
            top_k,
        }
    }

    /// Returns the `top_k` fragments most similar to `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedFragment>, PipelineError> {
        let index = self.store.index(self.model.clone());
        let request = VectorSearchRequest::builder()
            .query(query)
            .samples(self.top_k as u64)
            .build()
            .map_err(|err| PipelineError::Storage(err.to_string()))?;

        let matches = index
            .top_n::<FragmentDocument>(request)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;

        debug!(query, matches = matches.len(), "vector search complete");

        Ok(matches
            .into_iter()
            .map(|(score, _id, doc)| RetrievedFragment {
                source: doc.source,
                title: doc.title,
                fragment_index: doc.fragment_index,
                content: doc.content,
                score,
            })
            .collect())
    }
}
