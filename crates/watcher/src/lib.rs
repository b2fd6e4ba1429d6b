//! Directory change monitoring for RTS
//!
//! This crate provides:
//! - Noise filtering for change events (sync temp/lock/database files)
//! - Asynchronous existence probes that never block on dead network mounts
//! - [`ChangeWaiter`]: wait for missing roots, wait for the next change
//! - [`MonitorLoop`]: debounce changes and trigger an external action

pub mod filter;
pub mod monitor;
pub mod probe;
pub mod waiter;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use filter::{ChangeFilter, FilterConfig};
pub use monitor::{MonitorCallback, MonitorLoop, MonitorPhase};
pub use waiter::{ChangeEvent, ChangeKind, ChangeWaiter, DirectoryWaiter, Readiness, WaitResult};

/// Cadence at which progress callbacks fire while waiting
pub const UI_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// How often watched roots are checked for existence
///
/// A watch can go stale silently when its root is removed, so existence is
/// polled independently of watch events.
pub const EXISTENCE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Answer of a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keep waiting
    Continue,
    /// Stop the wait; it returns its `Cancelled` outcome
    Cancel,
}

/// Errors produced while monitoring
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] rts_core::Error),

    /// Creating or polling a watch failed while the root still exists
    #[error("Cannot monitor directory \"{}\": {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The background existence check died
    #[error("Existence check for \"{}\" failed: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] ignore::Error),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, Error>;
