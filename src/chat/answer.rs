//! Context-constrained answer synthesis.

use rig::completion::{CompletionModel, Message};

use super::completion_text;
use super::history::ConversationLog;
use super::prompts::{NO_CONTEXT_ANSWER, answer_preamble, answer_prompt};
use super::retrieve::RetrievedFragment;
use crate::types::PipelineError;

/// Produces a grounded answer from retrieved fragments and the original
/// question.
pub struct AnswerSynthesizer<M>
where
    M: CompletionModel,
{
    model: M,
}

impl<M> AnswerSynthesizer<M>
where
    M: CompletionModel,
{
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Answers `question` from `fragments`. An empty retrieval short-circuits
    /// to a fixed "nothing found" answer without calling the model.
    pub async fn synthesize(
        &self,
        question: &str,
        log: &ConversationLog,
        fragments: &[RetrievedFragment],
    ) -> Result<String, PipelineError> {
        if fragments.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let request = self
            .model
            .completion_request(Message::user(answer_prompt(log, question)))
            .preamble(answer_preamble(fragments))
            .temperature(0.0)
            .build();

        let response = self
            .model
            .completion(request)
            .await
            .map_err(|err| PipelineError::Completion(err.to_string()))?;

        Ok(completion_text(response)?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::NoCallChatModel;

    #[tokio::test]
    async fn empty_retrieval_yields_fixed_answer_without_a_model_call() {
        let synthesizer = AnswerSynthesizer::new(NoCallChatModel);
        let mut log = ConversationLog::new();
        log.push("Do we get dental cover?", "Yes, through the base plan.");

        let answer = synthesizer
            .synthesize("What about optical?", &log, &[])
            .await
            .unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }
}
