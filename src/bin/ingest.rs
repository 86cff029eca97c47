//! Builds the policy vector index from a directory of HTML documents.
//!
//! ```bash
//! GEMINI_API_KEY=... cargo run --bin ingest
//! ```
//!
//! Configuration comes from `HR_RAG_*` environment variables (see
//! `policyrag::config`); set `HR_RAG_RESUME=1` to continue an interrupted
//! run.

use tracing_subscriber::FmtSubscriber;

use policyrag::config::AssistantConfig;
use policyrag::corpus::{TextSplitter, load_corpus};
use policyrag::embeddings::{embedding_model, gemini_client};
use policyrag::ingest::{IngestPipeline, ResumeTracker};
use policyrag::stores::sqlite::SqliteFragmentStore;
use policyrag::types::PipelineError;

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    init_tracing();

    let config = AssistantConfig::from_env()?;
    println!("Ingesting corpus from {}", config.corpus_dir.display());

    let documents = load_corpus(&config.corpus_dir, config.max_documents).await?;
    println!("{} HTML pages loaded", documents.len());
    if documents.is_empty() {
        println!("Nothing to ingest.");
        return Ok(());
    }

    let splitter = TextSplitter::new(config.fragment_chars, config.overlap_chars)?;

    // Preview the first fragment so a misconfigured extractor is obvious
    // before any embedding spend.
    if let Some(first) = splitter.split(&documents[0].text).into_iter().next() {
        let preview: String = first.chars().take(300).collect();
        println!("Preview of first fragment ({}):", documents[0].source);
        println!("{preview} ...");
    }

    let client = gemini_client()?;
    let model = embedding_model(&client, &config);
    let store = SqliteFragmentStore::open(&config.index_path, &model).await?;

    let tracker = if config.resume {
        let tracker = ResumeTracker::new(config.state_path());
        tracker.load().await?;
        Some(tracker)
    } else {
        None
    };

    let pipeline = IngestPipeline::new(model, splitter, config.embed_batch_size, config.batch_pause);
    let report = pipeline.run(&store, &documents, tracker.as_ref()).await?;

    println!("\nIngestion complete!");
    println!("  documents processed : {}", report.documents_processed);
    println!("  documents skipped   : {}", report.documents_skipped);
    println!("  fragments written   : {}", report.fragments_written);
    println!("  fragments failed    : {}", report.fragments_failed);
    println!("  duration            : {:.1?}", report.elapsed);
    println!("  sqlite index        : {}", config.index_path.display());

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
