//! ```text
//! Corpus directory ──► corpus::loader ──► PolicyDocument
//!                                  │
//!                                  ▼
//!                      corpus::splitter ──► FragmentRecord
//!                                  │
//!                                  ▼
//!            ingest::IngestPipeline ──► embeddings ──► stores::sqlite
//!
//! Conversation log + question ──► chat::rewrite ──► chat::retrieve
//!                                                         │
//!                                                         ▼
//!                              chat::answer ──► grounded answer ──► log
//! ```
//!
//! Two binaries drive the crate: `ingest` builds the vector index from a
//! directory of HTML policy pages, and `chat` runs the conversational
//! question-answering loop against it.

pub mod chat;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod ingest;
pub mod stores;
pub mod types;

pub use chat::engine::ChatEngine;
pub use config::AssistantConfig;
pub use ingest::IngestPipeline;
pub use stores::sqlite::SqliteFragmentStore;
pub use types::PipelineError;
