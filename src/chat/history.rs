//! Conversation state carried across chat turns.

use serde::{Deserialize, Serialize};

/// One completed question/answer turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Ordered list of exchanges, appended after every turn.
///
/// The log is rendered as a plain transcript for the rewrite prompt; no
/// windowing is applied, matching the original assistant's behavior.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    exchanges: Vec<Exchange>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed exchange.
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Renders the log as alternating `User:`/`Assistant:` lines.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for exchange in &self.exchanges {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("User: ");
            out.push_str(&exchange.question);
            out.push_str("\nAssistant: ");
            out.push_str(&exchange.answer);
        }
        out
    }
}
