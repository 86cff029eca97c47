//! Ingestion pipeline: split documents, embed fragment batches, persist.
//!
//! The loop is deliberately linear. Each document is split, its fragments
//! embedded in batches, and the batch written to the store before the next
//! document starts. A fixed pause between embedding calls keeps the
//! hosted provider's rate limiter quiet; there is no retry or backoff
//! beyond that. A failed batch is logged and the run moves on.

pub mod resume;

pub use resume::ResumeTracker;

use std::time::{Duration, Instant};

use rig::embeddings::EmbeddingModel;
use serde_json::json;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::corpus::{PolicyDocument, TextSplitter};
use crate::stores::{FragmentRecord, FragmentStore};
use crate::types::PipelineError;

/// Outcome of an ingest run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Documents split, embedded, and stored this run.
    pub documents_processed: usize,
    /// Documents skipped because the resume tracker knew them.
    pub documents_skipped: usize,
    /// Fragments written to the store.
    pub fragments_written: usize,
    /// Fragments dropped because their embedding batch failed.
    pub fragments_failed: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Drives documents through splitting, embedding, and storage.
pub struct IngestPipeline<E>
where
    E: EmbeddingModel,
{
    model: E,
    splitter: TextSplitter,
    batch_size: usize,
    batch_pause: Duration,
}

impl<E> IngestPipeline<E>
where
    E: EmbeddingModel,
{
    pub fn new(
        model: E,
        splitter: TextSplitter,
        batch_size: usize,
        batch_pause: Duration,
    ) -> Self {
        Self {
            model,
            splitter,
            batch_size,
            batch_pause,
        }
    }

    /// Ingests `documents` into `store`.
    ///
    /// With a tracker, documents already recorded are skipped and each
    /// document is marked processed only after all of its fragments are
    /// stored, so a partly failed document is retried on the next run.
    /// Any fragments a document left behind in an earlier run are removed
    /// before it is ingested again, so a retry replaces rather than
    /// duplicates.
    pub async fn run<S>(
        &self,
        store: &S,
        documents: &[PolicyDocument],
        tracker: Option<&ResumeTracker>,
    ) -> Result<IngestReport, PipelineError>
    where
        S: FragmentStore,
    {
        let start = Instant::now();
        let mut report = IngestReport::default();

        for document in documents {
            if let Some(tracker) = tracker {
                if tracker.contains(&document.source).await {
                    report.documents_skipped += 1;
                    info!(source = %document.source, "already ingested, skipping");
                    continue;
                }
            }

            let removed = store.delete_by_source(&document.source).await?;
            if removed > 0 {
                info!(
                    source = %document.source,
                    removed,
                    "replacing fragments left by an earlier run"
                );
            }

            let fragments = self.splitter.split(&document.text);
            if fragments.is_empty() {
                warn!(source = %document.source, "document produced no fragments");
                if let Some(tracker) = tracker {
                    tracker.mark_processed(&document.source).await?;
                }
                continue;
            }

            let records: Vec<FragmentRecord> = fragments
                .into_iter()
                .enumerate()
                .map(|(index, content)| {
                    FragmentRecord::new(
                        Uuid::new_v4().to_string(),
                        &document.source,
                        &document.title,
                        index,
                        content,
                    )
                    .with_metadata(json!({
                        "source": document.source,
                        "title": document.title,
                    }))
                })
                .collect();

            let mut document_failed = false;
            for batch in records.chunks(self.batch_size) {
                match self.embed_batch(batch).await {
                    Ok(embedded) => {
                        let written = embedded.len();
                        store.insert_fragments(embedded).await?;
                        report.fragments_written += written;
                    }
                    Err(err) => {
                        warn!(
                            source = %document.source,
                            batch = batch.len(),
                            error = %err,
                            "embedding batch failed, continuing"
                        );
                        report.fragments_failed += batch.len();
                        document_failed = true;
                    }
                }
                sleep(self.batch_pause).await;
            }

            report.documents_processed += 1;
            if let Some(tracker) = tracker {
                if !document_failed {
                    tracker.mark_processed(&document.source).await?;
                }
            }
            info!(source = %document.source, "ingested");
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }

    async fn embed_batch(
        &self,
        batch: &[FragmentRecord],
    ) -> Result<Vec<FragmentRecord>, PipelineError> {
        let texts: Vec<String> = batch.iter().map(|record| record.content.clone()).collect();
        let embeddings = self
            .model
            .embed_texts(texts)
            .await
            .map_err(|err| PipelineError::Embedding(err.to_string()))?;

        if embeddings.len() != batch.len() {
            return Err(PipelineError::Embedding(format!(
                "provider returned {} embeddings for {} fragments",
                embeddings.len(),
                batch.len()
            )));
        }

        Ok(batch
            .iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                let vector: Vec<f32> = embedding.vec.iter().map(|v| *v as f32).collect();
                record.clone().with_embedding(vector)
            })
            .collect())
    }
}
