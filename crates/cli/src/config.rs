//! Monitoring job configuration
//!
//! One TOML file describes one job: the folders to watch, the delay before
//! the action runs, and the command line of the action.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::FilterConfig;

/// Longest accepted delay (one day)
pub const MAX_DELAY_SECS: u64 = 86_400;

/// Default delay before the action runs
pub const DEFAULT_DELAY_SECS: u64 = 10;

/// A monitoring job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Folder phrases; may contain macros, `~` or a `[volume]` prefix
    pub directories: Vec<String>,

    /// Seconds without changes before the command runs
    pub delay_secs: u64,

    /// Command line run through the shell
    pub command: String,

    /// Extra gitignore-style patterns for changes to ignore
    pub ignore_patterns: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            delay_secs: DEFAULT_DELAY_SECS,
            command: String::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Load and parse a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply command line overrides
    ///
    /// Directories given on the command line extend the configured ones.
    pub fn with_overrides(
        mut self,
        directories: Vec<String>,
        delay_secs: Option<u64>,
        command: Option<String>,
    ) -> Self {
        self.directories.extend(directories);
        if let Some(delay) = delay_secs {
            self.delay_secs = delay;
        }
        if let Some(command) = command {
            self.command = command;
        }
        self
    }

    /// Check the job is runnable
    pub fn validate(&self) -> std::result::Result<(), rts_core::Error> {
        if self.directories.iter().all(|d| d.trim().is_empty()) {
            return Err(rts_core::Error::Configuration(
                "No folder to monitor".to_string(),
            ));
        }

        if self.delay_secs > MAX_DELAY_SECS {
            return Err(rts_core::Error::Configuration(format!(
                "delay_secs must be between 0 and {} (got {})",
                MAX_DELAY_SECS, self.delay_secs
            )));
        }

        if self.command.trim().is_empty() {
            return Err(rts_core::Error::Configuration(
                "No command to execute".to_string(),
            ));
        }

        Ok(())
    }

    /// Non-blank folder phrases
    pub fn phrases(&self) -> Vec<String> {
        self.directories
            .iter()
            .filter(|d| !d.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            additional_patterns: self.ignore_patterns.clone(),
        }
    }
}

/// Default configuration file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rts").join("config.toml"))
}

/// Load `path`, or the default file if it exists, or an empty job
pub fn load(path: Option<&Path>) -> Result<MonitorConfig> {
    if let Some(path) = path {
        return MonitorConfig::load_from(path);
    }

    match config_file_path() {
        Some(default) if default.exists() => MonitorConfig::load_from(&default),
        _ => Ok(MonitorConfig::default()),
    }
}

/// Write the example configuration to `path` unless a file is already there
///
/// Returns whether a file was written.
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, example_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# RTS monitoring job

# Folders to watch. Supported syntax:
#   ~/Documents          home folder
#   %HOME%/Pictures      environment variables
#   /backup/%date%       time macros: time date timestamp weekday day month
#                        week year hour min sec
#   [USB Stick]/photos   folder on a mounted volume
directories = ["~/Documents"]

# Seconds without changes before the command runs (0-86400)
delay_secs = 10

# Command run through the shell. The variables change_path and
# change_action (CREATE, UPDATE or DELETE) describe the last change.
command = "echo \"$change_action $change_path\""

# Changes to ignore, gitignore syntax relative to each folder
ignore_patterns = ["*.bak", "build/"]
"#
}
