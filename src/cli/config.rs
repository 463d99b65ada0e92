//! Config command handlers

use crate::cli::{load_config, ConfigInitArgs, ConfigShowArgs};
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../stratus.example.toml");

/// Handle `stratus config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit this file to tune polling budgets and cleanup.");

    Ok(())
}

/// Handle `stratus config show` command
pub fn handle_config_show(args: &ConfigShowArgs) -> anyhow::Result<String> {
    let config = load_config(&args.config)?;
    Ok(toml::to_string_pretty(&config)?)
}
