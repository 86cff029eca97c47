//! Composition of rewrite, retrieval, and synthesis into a chat turn.

use rig::completion::CompletionModel;
use rig::embeddings::EmbeddingModel;
use tracing::info;

use super::answer::AnswerSynthesizer;
use super::history::ConversationLog;
use super::retrieve::{RetrievedFragment, Retriever};
use super::rewrite::QueryRewriter;
use crate::stores::sqlite::SqliteFragmentStore;
use crate::types::PipelineError;

/// A source document cited by an answer.
#[derive(Clone, Debug)]
pub struct SourceRef {
    pub source: String,
    pub title: String,
    pub score: f64,
}

/// Result of one chat turn.
#[derive(Clone, Debug)]
pub struct ChatTurn {
    /// The grounded answer.
    pub answer: String,
    /// The standalone question retrieval actually ran with.
    pub standalone_question: String,
    /// Distinct source documents behind the answer, best match first.
    pub sources: Vec<SourceRef>,
}

/// One request/response pipeline: rewrite → retrieve → synthesize.
///
/// The engine is stateless; the caller owns the [`ConversationLog`] and
/// appends each turn to it.
pub struct ChatEngine<M, E>
where
    M: CompletionModel,
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    rewriter: QueryRewriter<M>,
    retriever: Retriever<E>,
    synthesizer: AnswerSynthesizer<M>,
}

impl<M, E> ChatEngine<M, E>
where
    M: CompletionModel + Clone,
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    pub fn new(
        chat_model: M,
        embedding_model: E,
        store: SqliteFragmentStore<E>,
        top_k: usize,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(chat_model.clone()),
            retriever: Retriever::new(store, embedding_model, top_k),
            synthesizer: AnswerSynthesizer::new(chat_model),
        }
    }

    /// Runs one full turn against the index.
    pub async fn respond(
        &self,
        question: &str,
        log: &ConversationLog,
    ) -> Result<ChatTurn, PipelineError> {
        let standalone_question = self.rewriter.rewrite(log, question).await?;
        let fragments = self.retriever.retrieve(&standalone_question).await?;
        info!(
            question,
            standalone = %standalone_question,
            fragments = fragments.len(),
            "retrieval complete"
        );

        let answer = self
            .synthesizer
            .synthesize(question, log, &fragments)
            .await?;

        Ok(ChatTurn {
            answer,
            standalone_question,
            sources: distinct_sources(&fragments),
        })
    }
}

/// Collapses fragments to one entry per source document, keeping the best
/// ranked occurrence.
fn distinct_sources(fragments: &[RetrievedFragment]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();
    for fragment in fragments {
        if sources.iter().any(|s| s.source == fragment.source) {
            continue;
        }
        sources.push(SourceRef {
            source: fragment.source.clone(),
            title: fragment.title.clone(),
            score: fragment.score,
        });
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(source: &str, score: f64) -> RetrievedFragment {
        RetrievedFragment {
            source: source.to_string(),
            title: source.to_string(),
            fragment_index: 0,
            content: String::new(),
            score,
        }
    }

    #[test]
    fn sources_are_deduplicated_in_rank_order() {
        let fragments = vec![
            fragment("leave.html", 0.1),
            fragment("pension.html", 0.2),
            fragment("leave.html", 0.3),
        ];
        let sources = distinct_sources(&fragments);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "leave.html");
        assert_eq!(sources[0].score, 0.1);
        assert_eq!(sources[1].source, "pension.html");
    }
}
