//! Monitor folders and run the configured command

use anyhow::{Context, Result};
use cli_lib::{config, TerminalCallback};
use owo_colors::OwoColorize;
use rts_core::PathResolver;
use std::path::PathBuf;
use tracing::info;
use watcher::{ChangeFilter, ChangeWaiter, MonitorLoop};

pub async fn run(
    config_path: Option<PathBuf>,
    dirs: Vec<String>,
    delay: Option<u64>,
    command: Option<String>,
) -> Result<()> {
    // 1. Load configuration and apply overrides
    let config = config::load(config_path.as_deref())?.with_overrides(dirs, delay, command);
    config.validate().context("Invalid configuration")?;

    // 2. Show what is monitored
    let resolver = PathResolver::default();
    println!("{}", "Monitoring".bold());
    for phrase in config.phrases() {
        let resolved = resolver.resolve(&phrase)?;
        if resolved.as_str() == phrase {
            println!("  {}", resolved.to_string().cyan());
        } else {
            println!("  {} {}", resolved.to_string().cyan(), format!("({})", phrase).dimmed());
        }
    }
    println!("{}: {}s", "Delay".dimmed(), config.delay_secs);
    println!("{}: {}", "Command".dimmed(), config.command);
    println!();

    // 3. Run until interrupted
    let filter = ChangeFilter::new(config.filter_config()).context("Invalid ignore pattern")?;
    let waiter = ChangeWaiter::new(resolver, filter);
    let callback = TerminalCallback::new(config.command.clone());
    let mut monitor = MonitorLoop::new(waiter, callback, config.phrases(), config.delay());

    tokio::select! {
        result = monitor.run() => match result {
            Ok(never) => match never {},
            Err(err) => Err(err).context("Monitoring stopped"),
        },
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
            println!("\n{} Stopped", "✓".green());
            Ok(())
        }
    }
}
