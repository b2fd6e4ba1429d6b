//! Configuration file command
//!
//! Shows, locates and creates the monitoring job file.

use anyhow::{Context, Result};
use cli_lib::config;
use owo_colors::OwoColorize;
use std::path::Path;

/// Show the effective configuration
pub async fn run_show(path: Option<&Path>) -> Result<()> {
    let config = config::load(path)?;
    let text = toml::to_string_pretty(&config).context("Failed to format configuration")?;

    match path.map(Path::to_path_buf).or_else(config::config_file_path) {
        Some(location) => println!("{}: {}\n", "Location".dimmed(), location.display().dimmed()),
        None => println!("{}\n", "No configuration directory".dimmed()),
    }
    println!("{}", text);

    if let Err(err) = config.validate() {
        println!("{} {}", "!".yellow(), err.yellow());
    }
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = config::config_file_path()
        .context("Could not determine config file path")?;

    if create && config::init_if_missing(&config_path)? {
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}
