//! RTS command line front end
//!
//! Shared by the `rts` binary and its tests: job configuration, the terminal
//! monitor callback with its external action, folder statistics and logging
//! setup.

pub mod action;
pub mod config;
pub mod logging;
pub mod scan;

pub use action::TerminalCallback;
pub use config::MonitorConfig;
pub use scan::ScanStats;
