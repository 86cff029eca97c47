//! Conversational query pipeline.
//!
//! A turn flows through three stages, each thin by design:
//!
//! * [`rewrite`] — condense history + question into a standalone question.
//! * [`retrieve`] — similarity search over the fragment index.
//! * [`answer`] — context-constrained answer synthesis.
//!
//! [`engine::ChatEngine`] composes them; [`history::ConversationLog`] is the
//! only state carried between turns.

pub mod answer;
pub mod engine;
pub mod history;
pub mod prompts;
pub mod retrieve;
pub mod rewrite;

pub use answer::AnswerSynthesizer;
pub use engine::{ChatEngine, ChatTurn, SourceRef};
pub use history::{ConversationLog, Exchange};
pub use retrieve::{RetrievedFragment, Retriever};
pub use rewrite::QueryRewriter;

use rig::completion::{AssistantContent, CompletionResponse};

use crate::types::PipelineError;

/// Collects the text parts of a completion response into one string.
pub(crate) fn completion_text<T>(response: CompletionResponse<T>) -> Result<String, PipelineError> {
    let mut combined = String::new();
    for content in response.choice.into_iter() {
        if let AssistantContent::Text(text) = content {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(text.text());
        }
    }
    if combined.trim().is_empty() {
        return Err(PipelineError::Completion(
            "completion returned no text".into(),
        ));
    }
    Ok(combined)
}
