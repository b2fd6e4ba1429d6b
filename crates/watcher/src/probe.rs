//! Asynchronous directory existence checks
//!
//! A stat on an unreachable network share can hang for a long time. The
//! check therefore runs on the blocking pool and the caller polls it with a
//! short timeout, invoking a tick callback on every timeout so progress can
//! still be reported (and the wait cancelled) while the check is pending.
//!
//! A cancelled check is left to finish in the background; it only reads the
//! path it was given.

use crate::{Error, Progress, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

/// Outcome of an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Exists(bool),
    Cancelled,
}

/// Check whether `path` is an available directory
///
/// `on_tick` runs every `poll` while the check is still pending.
pub async fn dir_exists(
    path: &Path,
    poll: Duration,
    on_tick: impl FnMut() -> Progress,
) -> Result<Probe> {
    let owned = path.to_path_buf();
    poll_check(path, move || owned.is_dir(), poll, on_tick).await
}

async fn poll_check(
    path: &Path,
    check: impl FnOnce() -> bool + Send + 'static,
    poll: Duration,
    mut on_tick: impl FnMut() -> Progress,
) -> Result<Probe> {
    let mut check = tokio::task::spawn_blocking(check);

    loop {
        match timeout(poll, &mut check).await {
            Ok(joined) => {
                let exists = joined.map_err(|source| Error::Probe {
                    path: path.to_path_buf(),
                    source,
                })?;
                trace!("{} exists: {}", path.display(), exists);
                return Ok(Probe::Exists(exists));
            }
            Err(_) => {
                if on_tick() == Progress::Cancel {
                    return Ok(Probe::Cancelled);
                }
            }
        }
    }
}
