use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::error;

use super::{Assistant, AskOutcome, UploadSummary};
use crate::AssistantError;
use crate::answer::Completer;
use crate::client::OpenAiClient;
use crate::config::{API_KEY_VAR, Config};
use crate::embeddings::Embedder;
use crate::history::SessionHistory;

pub const PDF_LOADED: &str = "PDF loaded successfully";
pub const ANSWER_GENERATED: &str = "Answer generated";

/// User-visible status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    /// Validation failures are warnings; everything else is an error
    #[inline]
    pub fn from_error(error: &AssistantError) -> Self {
        match error {
            AssistantError::Validation(message) => Self::Warning(message.clone()),
            other => Self::Error(other.to_string()),
        }
    }

    #[inline]
    pub fn render(&self) -> String {
        match self {
            Self::Success(message) => format!("{}", style(format!("✓ {}", message)).green()),
            Self::Warning(message) => format!("{}", style(format!("⚠ {}", message)).yellow()),
            Self::Error(message) => format!("{}", style(format!("✗ {}", message)).red()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Upload,
    Ask,
    History,
    Quit,
}

const MENU: [(MenuAction, &str); 4] = [
    (MenuAction::Upload, "Upload study PDF"),
    (MenuAction::Ask, "Ask a question"),
    (MenuAction::History, "Question history"),
    (MenuAction::Quit, "Quit"),
];

/// Run the interactive study session until the user quits
#[inline]
pub fn run_session(config: &Config) -> Result<()> {
    let client = OpenAiClient::new(config).context("Failed to initialize API client")?;

    eprintln!("{}", style("📘 AI Study Assistant").bold().cyan());
    eprintln!();
    if !client.has_api_key() {
        eprintln!(
            "{}",
            Notice::Warning(format!(
                "{} is not set; questions will fail until it is provided",
                API_KEY_VAR
            ))
            .render()
        );
    }

    let mut assistant = Assistant::new(client.clone(), client, config.retrieval);

    loop {
        let labels: Vec<&str> = MENU.iter().map(|(_, label)| *label).collect();
        let selection = Select::new()
            .with_prompt("What would you like to do?")
            .default(if assistant.has_index() { 1 } else { 0 })
            .items(labels.as_slice())
            .interact()?;

        match MENU[selection].0 {
            MenuAction::Upload => upload(&mut assistant)?,
            MenuAction::Ask => ask(&mut assistant)?,
            MenuAction::History => show_history(assistant.history())?,
            MenuAction::Quit => break,
        }
        eprintln!();
    }

    Ok(())
}

fn upload<E: Embedder, C: Completer>(assistant: &mut Assistant<E, C>) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Path to PDF")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    let path = PathBuf::from(path.trim());

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(0).with_style(ProgressStyle::with_template(
            "{bar:40} [{pos}/{len}] Embedding chunks",
        )?)
    } else {
        ProgressBar::hidden()
    };

    let result = assistant.upload_pdf(&path, |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    bar.finish_and_clear();

    match result {
        Ok(summary) => println!("{}", render_upload(&summary)),
        Err(e) => {
            error!("Upload failed: {}", e);
            eprintln!("{}", Notice::from_error(&e).render());
        }
    }

    Ok(())
}

fn ask<E: Embedder, C: Completer>(assistant: &mut Assistant<E, C>) -> Result<()> {
    let question: String = Input::new()
        .with_prompt("❓ Ask your question")
        .allow_empty(true)
        .interact_text()?;

    match assistant.ask(&question) {
        Ok(outcome) => println!("{}", render_answer(&outcome)),
        Err(e) => {
            if !matches!(e, AssistantError::Validation(_)) {
                error!("Ask failed: {}", e);
            }
            eprintln!("{}", Notice::from_error(&e).render());
        }
    }

    Ok(())
}

fn show_history(history: &SessionHistory) -> Result<()> {
    if history.is_empty() {
        eprintln!("{}", style("No questions asked yet.").dim());
        return Ok(());
    }

    let mut labels = history_labels(history);
    labels.push("Back".to_string());

    loop {
        let selection = Select::new()
            .with_prompt("🕘 Question history")
            .items(labels.as_slice())
            .default(0)
            .interact()?;

        let Some(entry) = history.all().nth(selection) else {
            return Ok(());
        };

        println!();
        println!("{}", style(&entry.question).bold());
        println!("{}", entry.answer);
        println!();
    }
}

/// One label per history entry, newest first
#[inline]
pub fn history_labels(history: &SessionHistory) -> Vec<String> {
    history
        .all()
        .map(|entry| format!("▸ {}", entry.question))
        .collect()
}

#[inline]
pub fn render_upload(summary: &UploadSummary) -> String {
    if summary.chunk_count == 0 {
        format!(
            "{}\n{}",
            Notice::Success(PDF_LOADED.to_string()).render(),
            style("No text found in the document; answers will not use any context.").dim()
        )
    } else {
        format!(
            "{}\n{}",
            Notice::Success(PDF_LOADED.to_string()).render(),
            style(format!(
                "{} characters indexed in {} chunks",
                summary.character_count, summary.chunk_count
            ))
            .dim()
        )
    }
}

#[inline]
pub fn render_answer(outcome: &AskOutcome) -> String {
    format!(
        "{}\n\n{}",
        Notice::Success(ANSWER_GENERATED.to_string()).render(),
        outcome.answer
    )
}
