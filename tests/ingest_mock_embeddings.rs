//! End-to-end ingestion with the deterministic hash embedder.
//!
//! Exercises the full offline path — corpus loading, splitting, embedding,
//! persistence, resume — without touching a hosted provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rig::embeddings::EmbeddingModel;
use rig::embeddings::embedding::{Embedding, EmbeddingError};
use tempfile::tempdir;

use policyrag::corpus::{PolicyDocument, TextSplitter, load_corpus};
use policyrag::embeddings::HashEmbedder;
use policyrag::ingest::{IngestPipeline, ResumeTracker};
use policyrag::stores::FragmentStore;
use policyrag::stores::sqlite::SqliteFragmentStore;

const DIMS: usize = 8;

async fn write_corpus(root: &std::path::Path) {
    tokio::fs::create_dir_all(root.join("benefits"))
        .await
        .unwrap();
    tokio::fs::write(
        root.join("leave.html"),
        r#"<html><head><title>Leave Policy</title></head><body>
            <h1>Annual Leave</h1>
            <p>Full-time employees accrue twenty-five days of annual leave per year.</p>
            <p>Up to five unused days may be carried into the following year.</p>
        </body></html>"#,
    )
    .await
    .unwrap();
    tokio::fs::write(
        root.join("benefits/pension.html"),
        r#"<html><head><title>Pension</title></head><body>
            <p>The company matches pension contributions up to six percent of salary.</p>
        </body></html>"#,
    )
    .await
    .unwrap();
}

/// Hash embedder that fails exactly one `embed_texts` call, counted across
/// clones, to simulate a provider rejecting a batch mid-run.
#[derive(Clone)]
struct FlakyEmbedder {
    inner: HashEmbedder,
    fail_on_call: usize,
    calls: Arc<AtomicUsize>,
}

impl FlakyEmbedder {
    fn new(dims: usize, fail_on_call: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dims),
            fail_on_call,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl EmbeddingModel for FlakyEmbedder {
    const MAX_DOCUMENTS: usize = 512;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, dims: Option<usize>) -> Self {
        Self::new(dims.unwrap_or(DIMS), usize::MAX)
    }

    fn ndims(&self) -> usize {
        self.inner.ndims()
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = call == self.fail_on_call;
        let delegate = self.inner.embed_texts(texts);
        async move {
            if fail {
                return Err(EmbeddingError::ResponseError(
                    "synthetic batch failure".into(),
                ));
            }
            delegate.await
        }
    }
}

#[tokio::test]
async fn ingest_then_search_finds_stored_fragments() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path()).await;

    let db = tempdir().unwrap();
    let db_path = db.path().join("index.sqlite");

    let model = HashEmbedder::new(DIMS);
    let store = SqliteFragmentStore::open(&db_path, &model).await.unwrap();

    let documents = load_corpus(corpus.path(), None).await.unwrap();
    assert_eq!(documents.len(), 2);

    let splitter = TextSplitter::new(1000, 100).unwrap();
    let pipeline = IngestPipeline::new(model.clone(), splitter, 500, Duration::ZERO);
    let report = pipeline.run(&store, &documents, None).await.unwrap();

    assert_eq!(report.documents_processed, 2);
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.fragments_failed, 0);
    assert!(report.fragments_written >= 2);
    assert_eq!(store.count().await.unwrap(), report.fragments_written);

    // The hash embedder is deterministic, so embedding a stored fragment's
    // exact text must return that fragment as the closest match.
    let pension = store
        .fragments_by_source("benefits/pension.html")
        .await
        .unwrap();
    assert!(!pension.is_empty());

    let embedded = model
        .embed_texts(vec![pension[0].content.clone()])
        .await
        .unwrap();
    let query: Vec<f32> = embedded[0].vec.iter().map(|v| *v as f32).collect();

    let results = store.search_similar(&query, 3).await.unwrap();
    assert!(!results.is_empty());
    let (best, score) = &results[0];
    assert_eq!(best.source, "benefits/pension.html");
    assert!(
        *score > 0.99,
        "identical text should score ~1.0, got {score}"
    );
}

#[tokio::test]
async fn resumed_run_skips_recorded_documents() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path()).await;

    let db = tempdir().unwrap();
    let db_path = db.path().join("index.sqlite");
    let state_path = db.path().join("index.sqlite.state.json");

    let model = HashEmbedder::new(DIMS);
    let store = SqliteFragmentStore::open(&db_path, &model).await.unwrap();
    let documents = load_corpus(corpus.path(), None).await.unwrap();
    let splitter = TextSplitter::new(1000, 100).unwrap();
    let pipeline = IngestPipeline::new(model.clone(), splitter, 500, Duration::ZERO);

    let tracker = ResumeTracker::new(&state_path);
    tracker.load().await.unwrap();
    let first = pipeline
        .run(&store, &documents, Some(&tracker))
        .await
        .unwrap();
    assert_eq!(first.documents_processed, 2);

    // Fresh tracker instance against the same state file.
    let tracker = ResumeTracker::new(&state_path);
    tracker.load().await.unwrap();
    let second = pipeline
        .run(&store, &documents, Some(&tracker))
        .await
        .unwrap();
    assert_eq!(second.documents_processed, 0);
    assert_eq!(second.documents_skipped, 2);
    assert_eq!(second.fragments_written, 0);
}

#[tokio::test]
async fn retry_after_failed_batch_does_not_duplicate_fragments() {
    let db = tempdir().unwrap();
    let db_path = db.path().join("index.sqlite");
    let state_path = db.path().join("index.sqlite.state.json");

    let store = SqliteFragmentStore::open(&db_path, &HashEmbedder::new(DIMS))
        .await
        .unwrap();

    let text = (0..120)
        .map(|i| format!("clause{i:03}"))
        .collect::<Vec<_>>()
        .join(" ");
    let documents = vec![PolicyDocument {
        source: "handbook.html".to_string(),
        title: "Employee Handbook".to_string(),
        text,
    }];

    // Second embedding call fails, so the document stores its first batch
    // but is not marked processed.
    let model = FlakyEmbedder::new(DIMS, 1);
    let splitter = TextSplitter::new(200, 40).unwrap();
    let pipeline = IngestPipeline::new(model, splitter, 2, Duration::ZERO);

    let tracker = ResumeTracker::new(&state_path);
    tracker.load().await.unwrap();
    let first = pipeline
        .run(&store, &documents, Some(&tracker))
        .await
        .unwrap();
    assert!(first.fragments_written > 0);
    assert!(first.fragments_failed > 0);

    // Fresh tracker over the same state; the document is unmarked, so the
    // retry must replace the partial fragments instead of stacking copies.
    let tracker = ResumeTracker::new(&state_path);
    tracker.load().await.unwrap();
    let second = pipeline
        .run(&store, &documents, Some(&tracker))
        .await
        .unwrap();
    assert_eq!(second.documents_skipped, 0);
    assert_eq!(second.fragments_failed, 0);

    let stored = store.fragments_by_source("handbook.html").await.unwrap();
    assert_eq!(stored.len(), second.fragments_written);
    assert_eq!(store.count().await.unwrap(), stored.len());

    let mut indices: Vec<usize> = stored.iter().map(|f| f.fragment_index).collect();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), stored.len(), "each fragment stored once");
}
