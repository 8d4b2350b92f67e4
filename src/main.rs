use clap::{Parser, Subcommand};
use study_assistant::Result;
use study_assistant::config::{Config, run_interactive_config, show_config};
use study_assistant::session::shell::run_session;

#[derive(Parser)]
#[command(name = "study-assistant")]
#[command(about = "Ask questions about a PDF, answered from its most relevant passages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the API connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { show }) => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        None => {
            run_session(&Config::load_default()?)?;
        }
    }

    Ok(())
}
