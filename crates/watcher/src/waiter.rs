//! Waiting for folders to appear and for changes inside them
//!
//! [`ChangeWaiter`] offers the two blocking waits the monitor loop is built
//! from. Both are cooperative: they call a progress callback at a fixed
//! cadence, and the callback may cancel the wait by returning
//! [`Progress::Cancel`].
//!
//! Watches live only for the duration of one `wait_for_changes` call and are
//! released when it returns, whatever the outcome. Dropping the future has
//! the same effect.

use crate::filter::ChangeFilter;
use crate::probe::{self, Probe};
use crate::{Error, Progress, Result, EXISTENCE_CHECK_INTERVAL, UI_UPDATE_INTERVAL};
use async_trait::async_trait;
use crossbeam_channel::{Receiver, TryRecvError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rts_core::PathResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Refresh ticks to idle after finding a missing folder before rechecking
const MISSING_RECHECK_TICKS: u32 = 10;

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Label handed to the external action
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Created => "CREATE",
            ChangeKind::Updated => "UPDATE",
            ChangeKind::Deleted => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A change below a watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Full path of the changed item
    pub path: PathBuf,
    /// File name of the changed item
    pub name: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { kind, path, name }
    }
}

/// Outcome of [`DirectoryWaiter::wait_for_missing_directories`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    AllExisting,
    Cancelled,
}

/// Outcome of [`DirectoryWaiter::wait_for_changes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    /// First change that survived filtering
    Changed(ChangeEvent),
    /// A watched root is gone
    DirMissing(PathBuf),
    /// The progress callback asked to stop
    Cancelled,
}

/// The waits the monitor loop depends on
#[async_trait]
pub trait DirectoryWaiter: Send {
    /// Wait until every phrase resolves to an existing directory
    ///
    /// `on_progress` receives the phrase currently being waited for.
    async fn wait_for_missing_directories(
        &mut self,
        phrases: &[String],
        on_progress: &mut (dyn for<'p> FnMut(&'p str) -> Progress + Send),
    ) -> Result<Readiness>;

    /// Watch all roots until the first relevant change
    ///
    /// `on_progress(true)` signals an idle tick with nothing pending.
    async fn wait_for_changes(
        &mut self,
        phrases: &[String],
        on_progress: &mut (dyn FnMut(bool) -> Progress + Send),
    ) -> Result<WaitResult>;
}

/// [`DirectoryWaiter`] backed by OS change notifications
#[derive(Debug)]
pub struct ChangeWaiter {
    resolver: PathResolver,
    filter: ChangeFilter,
    ui_interval: Duration,
    check_interval: Duration,
}

impl ChangeWaiter {
    /// Create a waiter resolving phrases with `resolver`
    pub fn new(resolver: PathResolver, filter: ChangeFilter) -> Self {
        Self {
            resolver,
            filter,
            ui_interval: UI_UPDATE_INTERVAL,
            check_interval: EXISTENCE_CHECK_INTERVAL,
        }
    }

    /// Override the progress and existence-check cadences
    pub fn with_intervals(mut self, ui_interval: Duration, check_interval: Duration) -> Self {
        self.ui_interval = ui_interval;
        self.check_interval = check_interval;
        self
    }

    /// Resolve phrases into a deduplicated set of roots
    fn resolve_roots(&self, phrases: &[String]) -> Result<Vec<PathBuf>> {
        let mut roots = BTreeSet::new();
        for phrase in phrases {
            let resolved = self.resolver.resolve(phrase)?;
            if !resolved.is_empty() {
                roots.insert(resolved.into_path_buf());
            }
        }

        if roots.is_empty() {
            return Err(rts_core::Error::Configuration("No folder to monitor".to_string()).into());
        }
        Ok(roots.into_iter().collect())
    }

    /// Tell a vanished root apart from a real failure
    ///
    /// A failure on a root that no longer exists is reported as missing.
    /// This also masks e.g. permission errors on a root that became
    /// unreadable.
    async fn missing_or(
        &self,
        root: &Path,
        err: Error,
        on_progress: &mut (dyn FnMut(bool) -> Progress + Send),
    ) -> Result<WaitResult> {
        match probe::dir_exists(root, self.ui_interval / 2, || on_progress(false)).await? {
            Probe::Cancelled => Ok(WaitResult::Cancelled),
            Probe::Exists(false) => {
                debug!("Ignoring error for vanished root: {}", err);
                Ok(WaitResult::DirMissing(root.to_path_buf()))
            }
            Probe::Exists(true) => Err(err),
        }
    }

    /// Turn one notification for `root` into a wait outcome
    ///
    /// `None` means the notification was noise and waiting goes on.
    async fn handle_notification(
        &self,
        root: &Path,
        notification: notify::Result<Event>,
        on_progress: &mut (dyn FnMut(bool) -> Progress + Send),
    ) -> Result<Option<WaitResult>> {
        let event = match notification {
            Ok(event) => event,
            Err(source) => {
                let err = Error::Watch {
                    path: root.to_path_buf(),
                    source,
                };
                return self.missing_or(root, err, on_progress).await.map(Some);
            }
        };

        let Some(change) = self.relevant_change(root, &event) else {
            return Ok(None);
        };

        if change.path == root {
            match probe::dir_exists(root, self.ui_interval / 2, || on_progress(false)).await? {
                Probe::Cancelled => return Ok(Some(WaitResult::Cancelled)),
                Probe::Exists(false) => return Ok(Some(WaitResult::DirMissing(root.to_path_buf()))),
                Probe::Exists(true) => {}
            }
        }

        debug!("Change detected: {} {}", change.kind, change.path.display());
        Ok(Some(WaitResult::Changed(change)))
    }

    fn relevant_change(&self, root: &Path, event: &Event) -> Option<ChangeEvent> {
        if event.need_rescan() {
            // Notifications were dropped; something changed
            return Some(ChangeEvent::new(ChangeKind::Updated, root.to_path_buf()));
        }

        changes_from_event(event)
            .into_iter()
            .find(|change| !self.filter.should_ignore(root, &change.path))
    }
}

#[async_trait]
impl DirectoryWaiter for ChangeWaiter {
    async fn wait_for_missing_directories(
        &mut self,
        phrases: &[String],
        on_progress: &mut (dyn for<'p> FnMut(&'p str) -> Progress + Send),
    ) -> Result<Readiness> {
        let phrases: Vec<&String> = phrases.iter().filter(|p| !p.trim().is_empty()).collect();
        if phrases.is_empty() {
            return Err(rts_core::Error::Configuration("No folder to monitor".to_string()).into());
        }

        let poll = self.ui_interval / 2;
        loop {
            let mut all_existing = true;

            for phrase in &phrases {
                // Re-resolved every pass: a volume name may have been mounted since
                let root = self.resolver.resolve(phrase)?;

                match probe::dir_exists(root.as_path(), poll, || on_progress(phrase)).await? {
                    Probe::Cancelled => return Ok(Readiness::Cancelled),
                    Probe::Exists(true) => {}
                    Probe::Exists(false) => {
                        debug!("Waiting for folder {} ({})", phrase, root);
                        all_existing = false;

                        for _ in 0..MISSING_RECHECK_TICKS {
                            sleep(poll).await;
                            if on_progress(phrase) == Progress::Cancel {
                                return Ok(Readiness::Cancelled);
                            }
                        }
                        break;
                    }
                }
            }

            if all_existing {
                return Ok(Readiness::AllExisting);
            }
        }
    }

    async fn wait_for_changes(
        &mut self,
        phrases: &[String],
        on_progress: &mut (dyn FnMut(bool) -> Progress + Send),
    ) -> Result<WaitResult> {
        let roots = self.resolve_roots(phrases)?;

        let session = match WatchSession::start(&roots) {
            Ok(session) => session,
            Err((root, err)) => return self.missing_or(&root, err, on_progress).await,
        };

        let poll = self.ui_interval / 2;
        let mut last_check: Option<Instant> = None;

        loop {
            // Watches do not reliably report removal of the watched root itself
            if last_check.map_or(true, |t| t.elapsed() >= self.check_interval) {
                last_check = Some(Instant::now());
                for root in &roots {
                    match probe::dir_exists(root, poll, || on_progress(false)).await? {
                        Probe::Cancelled => return Ok(WaitResult::Cancelled),
                        Probe::Exists(false) => {
                            info!("Folder missing: {}", root.display());
                            return Ok(WaitResult::DirMissing(root.clone()));
                        }
                        Probe::Exists(true) => {}
                    }
                }
            }

            loop {
                let (index, notification) = match session.events.try_recv() {
                    Ok(received) => received,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("Watch channel closed");
                        break;
                    }
                };
                let root = &roots[index];

                if let Some(result) = self.handle_notification(root, notification, on_progress).await? {
                    return Ok(result);
                }
            }

            sleep(poll).await;
            if on_progress(true) == Progress::Cancel {
                return Ok(WaitResult::Cancelled);
            }
        }
    }
}

/// Notification tagged with the index of its root
type Notification = (usize, notify::Result<Event>);

/// OS watches for one `wait_for_changes` call
struct WatchSession {
    /// Dropping a watcher unregisters its OS watch
    watchers: Vec<RecommendedWatcher>,
    events: Receiver<Notification>,
}

impl WatchSession {
    /// Watch every root recursively
    ///
    /// On failure, returns the root that could not be watched.
    fn start(roots: &[PathBuf]) -> std::result::Result<Self, (PathBuf, Error)> {
        let (tx, events) = crossbeam_channel::unbounded();
        let mut watchers = Vec::with_capacity(roots.len());

        for (index, root) in roots.iter().enumerate() {
            let tx = tx.clone();
            let fail = |source| {
                (
                    root.clone(),
                    Error::Watch {
                        path: root.clone(),
                        source,
                    },
                )
            };

            let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                // Receiver gone means the session is over
                let _ = tx.send((index, res));
            })
            .map_err(fail)?;
            watcher.watch(root, RecursiveMode::Recursive).map_err(fail)?;

            debug!("Watching {}", root.display());
            watchers.push(watcher);
        }

        Ok(Self { watchers, events })
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        debug!("Releasing {} watch(es)", self.watchers.len());
    }
}

/// Translate a notification into change events, one per affected path
///
/// Access notifications carry no change and yield nothing.
pub fn changes_from_event(event: &Event) -> Vec<ChangeEvent> {
    event
        .paths
        .iter()
        .enumerate()
        .filter_map(|(index, path)| {
            let kind = match event.kind {
                EventKind::Access(_) => return None,
                EventKind::Create(_) => ChangeKind::Created,
                EventKind::Remove(_) => ChangeKind::Deleted,
                EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Deleted,
                EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                    if index == 0 {
                        ChangeKind::Deleted
                    } else {
                        ChangeKind::Created
                    }
                }
                EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Updated,
            };
            Some(ChangeEvent::new(kind, path.clone()))
        })
        .collect()
}
