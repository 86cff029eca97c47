//! Runtime configuration for the ingestion and chat binaries.
//!
//! Configuration resolves in two layers, later wins:
//!
//! 1. Compiled defaults (the constants the original deployment shipped with).
//! 2. Environment variables prefixed `HR_RAG_*`, with `.env` support via
//!    `dotenvy`.
//!
//! The Gemini API key itself is read by the provider client from
//! `GEMINI_API_KEY` and is deliberately not part of this struct.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Settings shared by the ingestion pipeline and the chat engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Directory holding the HTML policy corpus.
    pub corpus_dir: PathBuf,
    /// SQLite file the vector index is persisted to.
    pub index_path: PathBuf,
    /// Target fragment size in characters.
    pub fragment_chars: usize,
    /// Overlap between consecutive fragments in characters.
    pub overlap_chars: usize,
    /// Maximum fragments embedded per provider call.
    pub embed_batch_size: usize,
    /// Fixed pause between embedding batches (throttle, not backoff).
    pub batch_pause: Duration,
    /// Embedding model name passed to the provider.
    pub embedding_model: String,
    /// Embedding vector dimension for the model above.
    pub embedding_dims: usize,
    /// Chat model used for query rewriting and answer synthesis.
    pub chat_model: String,
    /// Number of fragments retrieved per question.
    pub top_k: usize,
    /// Optional cap on documents ingested (debug runs).
    pub max_documents: Option<usize>,
    /// Whether the ingest run should skip documents recorded as processed.
    pub resume: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("hr-policies"),
            index_path: PathBuf::from("policy_index.sqlite"),
            fragment_chars: 1000,
            overlap_chars: 100,
            embed_batch_size: 500,
            batch_pause: Duration::from_secs(1),
            embedding_model: "embedding-001".to_string(),
            embedding_dims: 768,
            chat_model: "gemini-1.5-flash".to_string(),
            top_k: 4,
            max_documents: None,
            resume: false,
        }
    }
}

impl AssistantConfig {
    /// Resolves configuration from defaults plus `HR_RAG_*` environment
    /// overrides. Loads a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(dir) = env::var("HR_RAG_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("HR_RAG_INDEX_PATH") {
            config.index_path = PathBuf::from(path);
        }
        if let Some(value) = parse_env("HR_RAG_FRAGMENT_CHARS")? {
            config.fragment_chars = value;
        }
        if let Some(value) = parse_env("HR_RAG_OVERLAP_CHARS")? {
            config.overlap_chars = value;
        }
        if let Some(value) = parse_env("HR_RAG_EMBED_BATCH_SIZE")? {
            config.embed_batch_size = value;
        }
        if let Some(millis) = parse_env::<u64>("HR_RAG_BATCH_PAUSE_MS")? {
            config.batch_pause = Duration::from_millis(millis);
        }
        if let Ok(model) = env::var("HR_RAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(value) = parse_env("HR_RAG_EMBEDDING_DIMS")? {
            config.embedding_dims = value;
        }
        if let Ok(model) = env::var("HR_RAG_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(value) = parse_env("HR_RAG_TOP_K")? {
            config.top_k = value;
        }
        if let Some(value) = parse_env("HR_RAG_MAX_DOCUMENTS")? {
            config.max_documents = Some(value);
        }
        if let Ok(value) = env::var("HR_RAG_RESUME") {
            config.resume = value == "1" || value.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Path where the ingest resume state is persisted, derived from the
    /// index path so the two files travel together.
    pub fn state_path(&self) -> PathBuf {
        let mut name = self
            .index_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "policy_index".to_string());
        name.push_str(".state.json");
        self.index_path.with_file_name(name)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.fragment_chars == 0 {
            return Err(PipelineError::Config(
                "fragment_chars must be positive".into(),
            ));
        }
        if self.overlap_chars >= self.fragment_chars {
            return Err(PipelineError::Config(format!(
                "overlap_chars ({}) must be smaller than fragment_chars ({})",
                self.overlap_chars, self.fragment_chars
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(PipelineError::Config(
                "embed_batch_size must be positive".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::Config("top_k must be positive".into()));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, PipelineError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| PipelineError::Config(format!("unable to parse {key}='{raw}': {err}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_constants() {
        let config = AssistantConfig::default();
        assert_eq!(config.fragment_chars, 1000);
        assert_eq!(config.overlap_chars, 100);
        assert_eq!(config.embed_batch_size, 500);
        assert_eq!(config.batch_pause, Duration::from_secs(1));
        assert_eq!(config.top_k, 4);
        assert!(config.max_documents.is_none());
    }

    #[test]
    fn state_path_sits_beside_index() {
        let config = AssistantConfig {
            index_path: PathBuf::from("data/index.sqlite"),
            ..Default::default()
        };
        assert_eq!(
            config.state_path(),
            PathBuf::from("data/index.sqlite.state.json")
        );
    }

    #[test]
    fn validation_rejects_oversized_overlap() {
        let config = AssistantConfig {
            fragment_chars: 100,
            overlap_chars: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
