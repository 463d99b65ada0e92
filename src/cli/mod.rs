//! CLI module for Stratus
//!
//! # Commands
//!
//! - `config` - Configuration utilities (init, show)
//! - `simulate` - Destroy a fleet on the in-memory provider and report the cleanup
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Write the default configuration
//! stratus config init
//!
//! # Watch the reaper retry through two "in use" responses
//! stratus simulate --conflicts 2
//!
//! # Generate shell completions
//! stratus completions bash > ~/.bash_completion.d/stratus
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod simulate;

pub use completions::handle_completions;
pub use config::{handle_config_init, handle_config_show};
pub use simulate::run_simulate;

use crate::config::StratusConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Stratus - resource convergence and cleanup for compute clients
#[derive(Parser, Debug)]
#[command(
    name = "stratus",
    version,
    about = "Wait for cloud resources to settle and clean up after destroyed nodes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Run a destroy-and-reap scenario against the in-memory provider
    Simulate(SimulateArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
    /// Print the effective configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "stratus.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "stratus.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "stratus.toml")]
    pub config: PathBuf,

    /// Region the simulated fleet lives in
    #[arg(short, long, default_value = "us-east-1")]
    pub region: String,

    /// Times the web security group reports "in use" before it can be deleted
    #[arg(long, default_value = "0")]
    pub conflicts: u32,

    /// Keep one web node running so its group is left in place
    #[arg(long)]
    pub keep_one: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "STRATUS_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration the way every command does: file if present, then
/// environment overrides.
pub fn load_config(path: &Path) -> Result<StratusConfig, crate::config::ConfigError> {
    let config = if path.exists() {
        StratusConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        StratusConfig::default()
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}
