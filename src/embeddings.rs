//! Embedding model construction.
//!
//! Production runs use the hosted Gemini embedding model through `rig`.
//! [`HashEmbedder`] is a deterministic stand-in for offline runs and tests;
//! it has no semantic signal but is stable across processes, which is all
//! the integration tests need.

use rig::client::{CompletionClient, EmbeddingsClient};
use rig::embeddings::embedding::{Embedding, EmbeddingError};
use rig::embeddings::EmbeddingModel;
use rig::providers::gemini;

use crate::config::AssistantConfig;
use crate::types::PipelineError;

/// Builds a Gemini client from the `GEMINI_API_KEY` environment variable.
pub fn gemini_client() -> Result<gemini::Client, PipelineError> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| PipelineError::Config("GEMINI_API_KEY is not set".into()))?;
    gemini::Client::new(&api_key).map_err(|err| PipelineError::Config(err.to_string()))
}

/// Embedding model named by the configuration.
pub fn embedding_model(
    client: &gemini::Client,
    config: &AssistantConfig,
) -> gemini::embedding::EmbeddingModel {
    client.embedding_model_with_ndims(&config.embedding_model, config.embedding_dims)
}

/// Chat model named by the configuration.
pub fn chat_model(
    client: &gemini::Client,
    config: &AssistantConfig,
) -> gemini::completion::CompletionModel {
    client.completion_model(&config.chat_model)
}

/// Deterministic hash-based embedder for tests and offline runs.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl EmbeddingModel for HashEmbedder {
    const MAX_DOCUMENTS: usize = 512;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, dims: Option<usize>) -> Self {
        Self::new(dims.unwrap_or(768))
    }

    fn ndims(&self) -> usize {
        self.dims
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let dims = self.dims;
        let documents: Vec<String> = texts.into_iter().collect();
        async move {
            Ok(documents
                .into_iter()
                .map(|document| Embedding {
                    vec: hash_to_vec(&document, dims),
                    document,
                })
                .collect())
        }
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i % 64) as u32) ^ ((i as u64) << 17);
            (bits as f64) / u64::MAX as f64 - 0.5
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(16);
        let inputs = vec!["leave policy".to_string(), "pension plan".to_string()];

        let first = embedder.embed_texts(inputs.clone()).await.unwrap();
        let second = embedder.embed_texts(inputs).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].vec, second[0].vec);
        assert_ne!(first[0].vec, first[1].vec);
        assert_eq!(first[0].vec.len(), 16);
    }
}
