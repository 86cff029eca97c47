//! Interactive chat over the ingested policy index.
//!
//! ```bash
//! GEMINI_API_KEY=... cargo run --bin chat
//! ```
//!
//! Type a question per line; `exit`, `quit`, or end-of-input leaves the
//! loop. A failed turn is printed and the conversation continues.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::FmtSubscriber;

use policyrag::chat::{ChatEngine, ConversationLog};
use policyrag::config::AssistantConfig;
use policyrag::embeddings::{chat_model, embedding_model, gemini_client};
use policyrag::stores::sqlite::SqliteFragmentStore;
use policyrag::types::PipelineError;

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    init_tracing();

    let config = AssistantConfig::from_env()?;
    if !config.index_path.exists() {
        return Err(PipelineError::Config(format!(
            "index not found at {}; run the `ingest` binary first",
            config.index_path.display()
        )));
    }

    let client = gemini_client()?;
    let embedder = embedding_model(&client, &config);
    let completer = chat_model(&client, &config);
    let store = SqliteFragmentStore::open(&config.index_path, &embedder).await?;
    let engine = ChatEngine::new(completer, embedder, store, config.top_k);

    println!("HR policy assistant. Ask a question, or 'exit' to leave.");

    let mut log = ConversationLog::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match engine.respond(question, &log).await {
            Ok(turn) => {
                println!("\n{}", turn.answer);
                if !turn.sources.is_empty() {
                    println!();
                    for source in &turn.sources {
                        println!("  ↳ {} ({})", source.title, source.source);
                    }
                }
                log.push(question, turn.answer);
            }
            Err(err) => {
                // Keep the session alive; the next question starts fresh.
                println!("\nerror: {err}");
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("warn").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
