// Configuration management module
// TOML settings, the API credential, and interactive setup

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{API_KEY_VAR, ApiKey, Config, ConfigError, OpenAiConfig, RetrievalConfig};
