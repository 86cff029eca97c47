//! History-aware query rewriting.

use rig::completion::{CompletionModel, Message};
use tracing::debug;

use super::completion_text;
use super::history::ConversationLog;
use super::prompts::{CONDENSE_INSTRUCTION, condense_prompt};
use crate::types::PipelineError;

/// Turns a follow-up question into a standalone one using the chat model.
pub struct QueryRewriter<M>
where
    M: CompletionModel,
{
    model: M,
}

impl<M> QueryRewriter<M>
where
    M: CompletionModel,
{
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Rewrites `question` so it can be understood without the log.
    ///
    /// With no prior turns the question is already standalone and is
    /// returned as is, without a model call.
    pub async fn rewrite(
        &self,
        log: &ConversationLog,
        question: &str,
    ) -> Result<String, PipelineError> {
        if log.is_empty() {
            return Ok(question.trim().to_string());
        }

        let request = self
            .model
            .completion_request(Message::user(condense_prompt(log, question)))
            .preamble(CONDENSE_INSTRUCTION.to_owned())
            .temperature(0.0)
            .build();

        let response = self
            .model
            .completion(request)
            .await
            .map_err(|err| PipelineError::Completion(err.to_string()))?;

        let standalone = completion_text(response)?.trim().to_string();
        debug!(original = question, %standalone, "question rewritten");
        Ok(standalone)
    }
}
