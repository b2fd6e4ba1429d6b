//! Terminal front end of the monitor and the external action

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::process::{Command, ExitStatus};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, info};
use watcher::{ChangeEvent, MonitorCallback, MonitorPhase};

/// Environment variable carrying the changed path
pub const ENV_CHANGE_PATH: &str = "change_path";

/// Environment variable carrying the change kind label
pub const ENV_CHANGE_ACTION: &str = "change_action";

/// Build the shell invocation of `command`
pub fn shell_command(command: &str, last_change: Option<&ChangeEvent>) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };

    match last_change {
        Some(change) => cmd
            .env(ENV_CHANGE_PATH, &change.path)
            .env(ENV_CHANGE_ACTION, change.kind.label()),
        // Never pass on values inherited from our own environment
        None => cmd.env_remove(ENV_CHANGE_PATH).env_remove(ENV_CHANGE_ACTION),
    };
    cmd
}

/// Run `command` and wait for it
///
/// A non-zero exit status is an error.
pub fn run_action(command: &str, last_change: Option<&ChangeEvent>) -> Result<ExitStatus> {
    let status = shell_command(command, last_change)
        .status()
        .with_context(|| format!("Cannot start command \"{}\"", command))?;

    if !status.success() {
        anyhow::bail!("Command \"{}\" failed: {}", command, status);
    }
    Ok(status)
}

/// [`MonitorCallback`] printing to the terminal
pub struct TerminalCallback {
    command: String,
    spinner: ProgressBar,
    actions_run: usize,
    errors_reported: usize,
}

impl TerminalCallback {
    pub fn new(command: impl Into<String>) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self::with_spinner(command, spinner)
    }

    /// Callback without terminal output
    pub fn hidden(command: impl Into<String>) -> Self {
        Self::with_spinner(command, ProgressBar::hidden())
    }

    fn with_spinner(command: impl Into<String>, spinner: ProgressBar) -> Self {
        Self {
            command: command.into(),
            spinner,
            actions_run: 0,
            errors_reported: 0,
        }
    }

    pub fn actions_run(&self) -> usize {
        self.actions_run
    }

    pub fn errors_reported(&self) -> usize {
        self.errors_reported
    }

    fn execute(&mut self, last_change: Option<&ChangeEvent>) {
        match last_change {
            Some(change) => info!(
                "Running action for {} {}",
                change.kind,
                change.path.display()
            ),
            None => info!("Running action"),
        }

        self.actions_run += 1;
        self.spinner.println(format!(
            "{} Executing: {}",
            "▶".green(),
            self.command.cyan()
        ));

        let command = self.command.clone();
        let result = self.spinner.suspend(|| run_action(&command, last_change));
        if let Err(err) = result {
            self.report_error(&format!("{:#}", err));
        }
    }
}

impl MonitorCallback for TerminalCallback {
    fn set_phase(&mut self, phase: MonitorPhase) {
        let line = match phase {
            MonitorPhase::Waiting => format!("{}", "Waiting for missing folders...".yellow()),
            MonitorPhase::Active => format!("{}", "Monitoring active".green()),
        };
        self.spinner.println(line);
    }

    fn request_ui_refresh(&mut self, missing: Option<&str>) {
        match missing {
            Some(phrase) => self.spinner.set_message(format!("Waiting for {}", phrase)),
            None => self.spinner.set_message("Waiting for changes"),
        }
        self.spinner.tick();
    }

    fn execute_external_command(&mut self, last_change: Option<&ChangeEvent>) {
        // Monitoring pauses while the command runs
        let multi_thread = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        if multi_thread {
            tokio::task::block_in_place(|| self.execute(last_change));
        } else {
            self.execute(last_change);
        }
    }

    fn report_error(&mut self, message: &str) {
        self.errors_reported += 1;
        error!("{}", message);
        self.spinner
            .println(format!("{} {}", "✗".red(), message.red()));
    }
}

impl Drop for TerminalCallback {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}
