use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Completer;
use crate::client::{OpenAiClient, ServiceError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Send `prompt` as a single user message and return the first choice's text
    #[inline]
    pub fn generate_completion(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: &self.completion_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self.post_json("chat/completions", &request)?;
        let answer = first_choice_text(response)?;

        debug!("Received completion ({} characters)", answer.len());
        Ok(answer)
    }
}

impl Completer for OpenAiClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        self.generate_completion(prompt)
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String, ServiceError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ServiceError::NoChoices)?;

    choice.message.content.ok_or_else(|| {
        ServiceError::MalformedResponse("completion choice has no message content".to_string())
    })
}
