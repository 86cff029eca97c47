//! Corpus handling: loading HTML policy pages and splitting them into
//! retrieval-sized fragments.
//!
//! * [`loader`] — directory walking, HTML text extraction, document metadata.
//! * [`splitter`] — recursive character splitting with a separator ladder.

pub mod loader;
pub mod splitter;

pub use loader::{PolicyDocument, load_corpus};
pub use splitter::TextSplitter;
