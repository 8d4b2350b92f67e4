
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{API_KEY_VAR, ApiKey, Config, OpenAiConfig, RetrievalConfig};
use crate::client::OpenAiClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Study Assistant Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("API Configuration").bold().yellow());
    eprintln!("Configure the OpenAI-compatible service used for embeddings and answers.");
    eprintln!();

    configure_openai(&mut config.openai)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_connection(&config)? {
        eprintln!("{}", style("✓ API connection successful!").green());
    } else {
        eprintln!("{}", style("⚠ Warning: Could not reach the API").yellow());
        eprintln!(
            "You can continue, but make sure {} is set and the service is reachable before asking questions.",
            API_KEY_VAR
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    for line in describe_config(&config) {
        eprintln!("{}", line);
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Human-readable summary of `config`. The credential is reported only as present or absent.
#[inline]
pub fn describe_config(config: &Config) -> Vec<String> {
    let api_url = match config.api_url() {
        Ok(url) => style(url.to_string()).cyan().to_string(),
        Err(e) => format!("{} ({})", style("Invalid").red(), e),
    };
    let credential = if config.api_key.is_some() {
        style("set").green().to_string()
    } else {
        style("not set").red().to_string()
    };

    vec![
        style("API Settings:").bold().yellow().to_string(),
        format!("  Base URL: {}", api_url),
        format!(
            "  Embedding Model: {}",
            style(&config.openai.embedding_model).cyan()
        ),
        format!(
            "  Embedding Dimension: {}",
            style(config.openai.embedding_dimension).cyan()
        ),
        format!(
            "  Completion Model: {}",
            style(&config.openai.completion_model).cyan()
        ),
        format!(
            "  Timeout: {}s",
            style(config.openai.timeout_seconds).cyan()
        ),
        format!("  {}: {}", API_KEY_VAR, credential),
        String::new(),
        style("Retrieval Settings:").bold().yellow().to_string(),
        format!(
            "  Chunk Size: {} characters",
            style(config.retrieval.chunk_size).cyan()
        ),
        format!("  Tree Count: {}", style(config.retrieval.tree_count).cyan()),
        format!("  Top K: {}", style(config.retrieval.top_k).cyan()),
    ]
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().map_or_else(
        |_| -> Result<Config> {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: Config::config_dir()?,
                api_key: ApiKey::from_environment(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(openai.base_url.clone())
        .validate_with(|input: &String| -> Result<(), String> {
            let mut candidate = openai.clone();
            candidate
                .set_base_url(input.clone())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(openai.embedding_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(openai.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let completion_model: String = Input::new()
        .with_prompt("Completion model")
        .default(openai.completion_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout in seconds")
        .default(openai.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    openai.set_base_url(base_url)?;
    openai.set_embedding_model(embedding_model)?;
    openai.set_embedding_dimension(embedding_dimension)?;
    openai.set_completion_model(completion_model)?;
    openai.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size in characters")
        .default(retrieval.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100_000).contains(input) {
                Ok(())
            } else {
                Err("Chunk size must be between 1 and 100000")
            }
        })
        .interact_text()?;

    let tree_count: usize = Input::new()
        .with_prompt("Index tree count (more trees, better recall)")
        .default(retrieval.tree_count)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=1000).contains(input) {
                Ok(())
            } else {
                Err("Tree count must be between 1 and 1000")
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Top k must be between 1 and 100")
            }
        })
        .interact_text()?;

    retrieval.set_chunk_size(chunk_size)?;
    retrieval.set_tree_count(tree_count)?;
    retrieval.set_top_k(top_k)?;

    Ok(())
}

fn non_empty(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn test_connection(config: &Config) -> Result<bool> {
    if config.api_key.is_none() {
        return Ok(false);
    }

    let client = OpenAiClient::new(config)?.with_timeout(std::time::Duration::from_secs(5));
    Ok(client.check_connection().is_ok())
}
