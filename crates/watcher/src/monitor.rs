//! The monitor state machine
//!
//! ```text
//!   Waiting ──all roots exist──▶ Active ──root missing──▶ Waiting
//! ```
//!
//! While Active, a debounce deadline decides when the external action runs:
//! every change pushes the deadline out by `delay`, and the action fires once
//! the deadline passes on an idle tick. Afterwards no action is pending until
//! the next change.

use crate::waiter::{ChangeEvent, ChangeKind, DirectoryWaiter, Readiness, WaitResult};
use crate::{Progress, Result};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

/// Pause before restarting after a failed monitoring cycle
pub const ERROR_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Monitor phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// At least one root is unavailable
    Waiting,
    /// All roots exist and are watched
    Active,
}

/// Hooks the monitor reports to
pub trait MonitorCallback: Send {
    fn set_phase(&mut self, phase: MonitorPhase);

    /// Called on every progress tick
    ///
    /// While Waiting, `missing` names the phrase currently waited for.
    fn request_ui_refresh(&mut self, missing: Option<&str>);

    /// Run the configured action
    ///
    /// `last_change` is the most recent change seen since the monitor
    /// started, if any.
    fn execute_external_command(&mut self, last_change: Option<&ChangeEvent>);

    fn report_error(&mut self, message: &str);
}

/// Debounced monitor over a set of root phrases
pub struct MonitorLoop<W, C> {
    waiter: W,
    callback: C,
    phrases: Vec<String>,
    delay: Duration,
}

impl<W: DirectoryWaiter, C: MonitorCallback> MonitorLoop<W, C> {
    pub fn new(waiter: W, callback: C, phrases: Vec<String>, delay: Duration) -> Self {
        Self {
            waiter,
            callback,
            phrases,
            delay,
        }
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Monitor until the future is dropped
    ///
    /// Returns only when no root phrase is given. Every other failure is
    /// reported through [`MonitorCallback::report_error`] and monitoring
    /// restarts from the Waiting phase.
    pub async fn run(&mut self) -> Result<Infallible> {
        let phrases: Vec<String> = self
            .phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect();
        if phrases.is_empty() {
            return Err(rts_core::Error::Configuration("No folder to monitor".to_string()).into());
        }

        let MonitorLoop {
            waiter,
            callback,
            delay,
            ..
        } = self;

        info!("Monitoring {} folder(s), delay {:?}", phrases.len(), delay);

        let mut last_change = None;
        loop {
            if let Err(err) = monitor_cycle(waiter, callback, &phrases, *delay, &mut last_change).await {
                error!("Monitoring failed: {}", err);
                callback.report_error(&err.to_string());
                sleep(ERROR_RETRY_DELAY).await;
            }
        }
    }
}

/// One pass from Waiting to the next missing root
async fn monitor_cycle<W: DirectoryWaiter, C: MonitorCallback>(
    waiter: &mut W,
    callback: &mut C,
    phrases: &[String],
    delay: Duration,
    last_change: &mut Option<ChangeEvent>,
) -> Result<()> {
    callback.set_phase(MonitorPhase::Waiting);
    let readiness = waiter
        .wait_for_missing_directories(phrases, &mut |phrase| {
            callback.request_ui_refresh(Some(phrase));
            Progress::Continue
        })
        .await?;
    if readiness == Readiness::Cancelled {
        return Ok(());
    }
    callback.set_phase(MonitorPhase::Active);

    let mut next_action = Some(Instant::now() + delay);

    loop {
        let result = {
            let deadline = next_action;
            waiter
                .wait_for_changes(phrases, &mut |ready_for_sync| {
                    callback.request_ui_refresh(None);
                    match deadline {
                        Some(at) if ready_for_sync && Instant::now() >= at => Progress::Cancel,
                        _ => Progress::Continue,
                    }
                })
                .await?
        };

        match result {
            WaitResult::Changed(change) => {
                debug!("{} {}", change.kind, change.path.display());
                *last_change = Some(change);
                next_action = Some(Instant::now() + delay);
            }
            WaitResult::DirMissing(root) => {
                info!("Folder no longer available: {}", root.display());
                *last_change = Some(ChangeEvent::new(ChangeKind::Deleted, root));
                return Ok(());
            }
            WaitResult::Cancelled => {
                info!("Changes settled, running action");
                callback.execute_external_command(last_change.as_ref());
                next_action = None;
            }
        }
    }
}
