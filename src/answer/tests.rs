use super::*;
use std::cell::RefCell;

struct RecordingCompleter {
    prompts: RefCell<Vec<String>>,
    reply: Result<String, ServiceError>,
}

impl RecordingCompleter {
    fn replying(reply: Result<String, ServiceError>) -> Self {
        Self {
            prompts: RefCell::new(Vec::new()),
            reply,
        }
    }
}

impl Completer for RecordingCompleter {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.reply.clone()
    }
}

#[test]
fn prompt_structure() {
    let prompt = compose_prompt("AAAAA", "what comes after A?");

    assert!(prompt.starts_with(ROLE_FRAMING));
    assert!(prompt.contains("Context:\nAAAAA"));
    assert!(prompt.contains("Question:\nwhat comes after A?"));

    let context_at = prompt.find("Context:").expect("has context section");
    let question_at = prompt.find("Question:").expect("has question section");
    assert!(context_at < question_at);
}

#[test]
fn blank_context_section() {
    let prompt = compose_prompt("", "why?");
    assert!(prompt.contains("Context:\n\n\nQuestion:\nwhy?"));
}

#[test]
fn answer_is_returned_verbatim() {
    let composer = AnswerComposer::new(RecordingCompleter::replying(Ok(
        "  The answer.\n".to_string()
    )));

    let answer = composer.answer("why?", "because").expect("answer succeeds");

    assert_eq!(answer, "  The answer.\n");
    let prompts = composer.completer().prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0], compose_prompt("because", "why?"));
}

#[test]
fn service_failure_is_surfaced() {
    let composer = AnswerComposer::new(RecordingCompleter::replying(Err(ServiceError::NoChoices)));

    assert_eq!(composer.answer("why?", ""), Err(ServiceError::NoChoices));
}
