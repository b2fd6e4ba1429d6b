//! Change filtering
//!
//! Decides which change notifications are noise. Two sources:
//! 1. Built-in noise (always active): files the sync engine itself writes
//!    into monitored folders, plus OS metadata files
//! 2. Additional gitignore-style patterns from configuration
//!
//! Without (1) a sync run would trigger the next one forever.

use crate::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Suffix of files being written by a sync run
pub const TEMP_FILE_ENDING: &str = ".ffs_tmp";

/// Suffix of the lock file held during a sync run
pub const LOCK_FILE_ENDING: &str = ".ffs_lock";

/// Suffix of the sync-state database
pub const SYNC_DB_FILE_ENDING: &str = ".ffs_db";

#[cfg(target_os = "macos")]
const OS_METADATA_FILES: &[&str] = &[".DS_Store"];

#[cfg(windows)]
const OS_METADATA_FILES: &[&str] = &["desktop.ini", "thumbs.db"];

#[cfg(not(any(target_os = "macos", windows)))]
const OS_METADATA_FILES: &[&str] = &[];

/// Change filter
#[derive(Default)]
pub struct ChangeFilter {
    /// Additional patterns (optional)
    patterns: Option<Gitignore>,

    /// Configuration
    config: FilterConfig,
}

impl ChangeFilter {
    /// Build a filter from configuration
    pub fn new(config: FilterConfig) -> Result<Self> {
        let patterns = if config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new("");
            for pattern in &config.additional_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        Ok(Self { patterns, config })
    }

    /// Check if a change of `path`, below the watched `root`, is noise
    pub fn should_ignore(&self, root: &Path, path: &Path) -> bool {
        // 1. Built-in noise (always enforced)
        // Lossy so undecodable names still get their suffix checked
        if let Some(name) = path.file_name().map(|n| n.to_string_lossy()) {
            if is_noise(&name) {
                return true;
            }
        }

        // 2. Additional patterns, matched relative to the root
        if let Some(ref patterns) = self.patterns {
            if let Ok(relative) = path.strip_prefix(root) {
                if relative.as_os_str().is_empty() {
                    return false;
                }
                return patterns
                    .matched_path_or_any_parents(relative, path.is_dir())
                    .is_ignore();
            }
        }

        false
    }

    /// Get configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChangeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFilter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Check a file name against the built-in noise list
pub fn is_noise(name: &str) -> bool {
    if name.ends_with(TEMP_FILE_ENDING)
        || name.ends_with(LOCK_FILE_ENDING)
        || name.ends_with(SYNC_DB_FILE_ENDING)
    {
        return true;
    }

    if OS_METADATA_FILES
        .iter()
        .any(|meta| name.eq_ignore_ascii_case(meta))
    {
        return true;
    }

    // AppleDouble resource forks
    cfg!(target_os = "macos") && name.starts_with("._")
}

/// Filter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Gitignore-style patterns, relative to each watched root
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}
