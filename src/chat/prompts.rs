//! Prompt text and builders for the two completion calls.
//!
//! Pure functions so the exact request text is unit-testable without a
//! provider.

use super::history::ConversationLog;
use super::retrieve::RetrievedFragment;

/// System instruction for the standalone-question rewrite.
pub const CONDENSE_INSTRUCTION: &str = "Given a chat history and the latest user question, \
which might reference context in the chat history, formulate a standalone question which \
can be understood without the chat history. Do NOT answer the question; reformulate it if \
needed and otherwise return it as is.";

/// Answer returned without a model call when retrieval comes back empty.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find anything relevant to that in the HR policy documents.";

/// User message for the rewrite call.
pub fn condense_prompt(log: &ConversationLog, question: &str) -> String {
    format!(
        "Chat history:\n{}\n\nLatest question: {}",
        log.transcript(),
        question
    )
}

/// System instruction for answer synthesis, with the retrieved context
/// inlined.
pub fn answer_preamble(fragments: &[RetrievedFragment]) -> String {
    format!(
        "You are an assistant for question-answering tasks on HR policy. Use the \
following pieces of retrieved context to answer the question. If you don't know the \
answer, say that you don't know. Use three sentences maximum and keep the answer \
concise.\n\n{}",
        render_context(fragments)
    )
}

/// User message for the answer call. Prior turns are rendered inline so
/// follow-up questions keep their referents.
pub fn answer_prompt(log: &ConversationLog, question: &str) -> String {
    if log.is_empty() {
        question.to_string()
    } else {
        format!(
            "Conversation so far:\n{}\n\nQuestion: {}",
            log.transcript(),
            question
        )
    }
}

/// Renders retrieved fragments as numbered, source-attributed blocks.
pub fn render_context(fragments: &[RetrievedFragment]) -> String {
    let mut out = String::new();
    for (rank, fragment) in fragments.iter().enumerate() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "[{}] {} ({})\n{}",
            rank + 1,
            fragment.title,
            fragment.source,
            fragment.content
        ));
    }
    out
}
