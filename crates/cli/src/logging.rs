//! Tracing setup

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file written below `--log-dir`
pub const LOG_FILE_NAME: &str = "rts.log";

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `default_level`. With a log directory,
/// output goes to `rts.log` there instead of stderr; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(log_dir: Option<&Path>, default_level: &str) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .context("Failed to install logger")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install logger")?;
            Ok(None)
        }
    }
}
