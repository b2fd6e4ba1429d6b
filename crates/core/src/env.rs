//! Read-only access to the process environment
//!
//! Path resolution depends on environment variables, the working directory,
//! the wall clock and mounted volumes. All of it goes through [`Environment`]
//! so resolution can be driven by a fixed environment in tests.

use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Environment accessor used by the path resolver
pub trait Environment: Send + Sync {
    /// Value of an environment variable
    fn var(&self, name: &str) -> Option<String>;

    /// Current working directory
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Mount point of the volume with the given display name, if mounted
    fn volume_path(&self, name: &str) -> Option<PathBuf>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn volume_path(&self, name: &str) -> Option<PathBuf> {
        let user = self.var("USER");
        volume_candidates(name, user.as_deref())
            .into_iter()
            .find(|p| p.is_dir())
    }
}

/// Conventional mount locations for a named volume
fn volume_candidates(name: &str, user: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(user) = user {
        candidates.push(Path::new("/media").join(user).join(name));
        candidates.push(Path::new("/run/media").join(user).join(name));
    }
    candidates.push(Path::new("/media").join(name));
    candidates.push(Path::new("/mnt").join(name));
    if cfg!(target_os = "macos") {
        candidates.push(Path::new("/Volumes").join(name));
    }
    candidates
}

/// A fixed environment
///
/// Variables, working directory, clock and volumes are all set up front.
/// When no time is given the local clock is used.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
    now: Option<NaiveDateTime>,
    volumes: BTreeMap<String, PathBuf>,
}

impl FixedEnvironment {
    /// Create an environment with the given working directory and no variables
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    /// Set an environment variable
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Pin the clock
    pub fn with_time(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Register a mounted volume
    pub fn with_volume(mut self, name: &str, mount: impl Into<PathBuf>) -> Self {
        self.volumes.insert(name.to_string(), mount.into());
        self
    }
}

impl Environment for FixedEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        if self.cwd.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no working directory configured",
            ));
        }
        Ok(self.cwd.clone())
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Local::now().naive_local())
    }

    fn volume_path(&self, name: &str) -> Option<PathBuf> {
        self.volumes.get(name).cloned()
    }
}
