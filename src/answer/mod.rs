// Answer composition
// Builds the grounding prompt and hands it to the completion service

pub mod completion;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::client::ServiceError;

/// Role framing that opens every prompt
pub const ROLE_FRAMING: &str = "You are a helpful study assistant.";

/// Produces a text completion for a prompt.
///
/// Implementations make a single call to the completion service and return
/// its text verbatim, or an error. They do not retry.
pub trait Completer {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Build the grounding prompt: role framing, a `Context:` section (blank when
/// nothing was retrieved) and a `Question:` section
#[inline]
pub fn compose_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nQuestion:\n{}\n",
        ROLE_FRAMING, context, question
    )
}

/// Answers questions against retrieved context using a [`Completer`]
#[derive(Debug, Clone)]
pub struct AnswerComposer<C> {
    completer: C,
}

impl<C: Completer> AnswerComposer<C> {
    #[inline]
    pub fn new(completer: C) -> Self {
        Self { completer }
    }

    #[inline]
    pub fn completer(&self) -> &C {
        &self.completer
    }

    /// Compose the prompt for `question` over `context` and return the service's answer
    #[inline]
    pub fn answer(&self, question: &str, context: &str) -> Result<String, ServiceError> {
        let prompt = compose_prompt(context, question);
        debug!(
            "Requesting completion (prompt length: {}, context length: {})",
            prompt.len(),
            context.len()
        );

        self.completer.complete(&prompt)
    }
}
