//! Path phrase resolution
//!
//! Turns user-entered folder phrases into absolute paths:
//! 1. Macro expansion (`%date%`, caller extensions, environment variables)
//! 2. Whitespace trimming
//! 3. Volume names (`[Backup]/photos`)
//! 4. Home directory (`~`) and working-directory resolution
//! 5. Trailing separator removal

use crate::env::{Environment, SystemEnvironment};
use crate::error::{Error, FsOp};
use crate::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tracing::{debug, trace};

/// Delimiter around macro names
pub const MACRO_SEP: char = '%';

/// Environment variables substituted back into paths when computing aliases
const ALIAS_VARS: &[&str] = &["HOME", "TMPDIR", "XDG_CONFIG_HOME", "XDG_DATA_HOME"];

/// Upper bound for nested alias expansion
const MAX_ALIAS_DEPTH: usize = 16;

/// A normalized absolute path
///
/// Empty when the phrase was blank; callers must treat that as invalid input,
/// never as the filesystem root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    /// Path as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path as a [`Path`]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// True if the phrase resolved to nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into an owned [`PathBuf`]
    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(self.0)
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// Resolves path phrases against an [`Environment`]
#[derive(Clone)]
pub struct PathResolver {
    env: Arc<dyn Environment>,
    /// Caller-supplied macros, checked after the built-in time macros
    extensions: Vec<(String, String)>,
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemEnvironment))
    }
}

impl PathResolver {
    /// Create a resolver over the given environment
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            extensions: Vec::new(),
        }
    }

    /// Add caller-defined macros (`%name%` -> value)
    pub fn with_extensions(mut self, extensions: Vec<(String, String)>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Expand all resolvable `%macro%` tokens in `text`
    pub fn expand_macros(&self, text: &str) -> String {
        expand_macros(text, self.env.as_ref(), &self.extensions)
    }

    /// Resolve a phrase into an absolute path
    ///
    /// Only fails when the working directory is needed and cannot be
    /// determined. Whether the path exists is not checked.
    pub fn resolve(&self, phrase: &str) -> Result<ResolvedPath> {
        let expanded = self.expand_macros(phrase);
        let trimmed = trim_phrase(&expanded);
        if trimmed.is_empty() {
            return Ok(ResolvedPath::default());
        }

        let path = match split_volume(trimmed) {
            Some((name, rest)) => match self.env.volume_path(name) {
                Some(mount) => join(&mount.to_string_lossy(), rest),
                None => {
                    debug!("Volume [{}] not mounted", name);
                    volume_placeholder(name, rest)
                }
            },
            None => self.make_absolute(trimmed)?,
        };

        let resolved = ResolvedPath(strip_trailing_separator(path));
        trace!("Resolved {:?} -> {}", phrase, resolved);
        Ok(resolved)
    }

    /// Alternative spellings of the same folder
    ///
    /// Substitutes well-known environment variables back into the path and
    /// expands macros recursively. Never contains `phrase` itself or an empty
    /// string.
    pub fn aliases(&self, phrase: &str) -> BTreeSet<String> {
        let phrase = trim_phrase(phrase);
        let mut aliases = BTreeSet::new();
        self.collect_aliases(phrase, &mut aliases, 0);

        aliases.remove(phrase);
        aliases.remove("");
        aliases
    }

    fn collect_aliases(&self, phrase: &str, aliases: &mut BTreeSet<String>, depth: usize) {
        if depth >= MAX_ALIAS_DEPTH {
            return;
        }

        // Environment variables: /home/u/docs -> %HOME%/docs
        for name in ALIAS_VARS {
            if let Some(value) = self.env.var(name) {
                let value = value.trim_end_matches(['/', MAIN_SEPARATOR]);
                if value.is_empty() {
                    continue;
                }
                // Whole leading components only: /home/u must not match /home/user2
                let Some(tail) = phrase.strip_prefix(value) else {
                    continue;
                };
                if !tail.is_empty() && !tail.starts_with(['/', MAIN_SEPARATOR]) {
                    continue;
                }
                aliases.insert(format!("{MACRO_SEP}{name}{MACRO_SEP}{tail}"));
            }
        }

        // Macros: %HOME%/docs -> /home/u/docs
        let expanded = self.expand_macros(phrase);
        if expanded != phrase && aliases.insert(expanded.clone()) {
            self.collect_aliases(&expanded, aliases, depth + 1);
        }
    }

    fn make_absolute(&self, path: &str) -> Result<String> {
        if path.starts_with(['/', MAIN_SEPARATOR]) || Path::new(path).is_absolute() {
            return Ok(path.to_string());
        }

        if let Some(tail) = path.strip_prefix('~') {
            if tail.is_empty() || tail.starts_with(['/', MAIN_SEPARATOR]) {
                return Ok(match self.env.var("HOME") {
                    Some(home) => join(&home, tail),
                    // Leave `~` as typed
                    None => path.to_string(),
                });
            }
        }

        let cwd = self
            .env
            .current_dir()
            .map_err(|e| Error::fs(FsOp::CurrentDir, ".", e))?;
        Ok(join(&cwd.to_string_lossy(), path))
    }
}

/// Expand `%macro%` tokens
///
/// Lookup order: built-in time macros, `extensions`, environment variables.
/// Unknown tokens stay verbatim and expansion resumes at their closing
/// delimiter, so one bad token does not block the following ones.
pub fn expand_macros(text: &str, env: &dyn Environment, extensions: &[(String, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let Some(start) = rest.find(MACRO_SEP) else {
            out.push_str(rest);
            break;
        };
        let after = &rest[start + 1..];
        let Some(len) = after.find(MACRO_SEP) else {
            out.push_str(rest);
            break;
        };

        let name = &after[..len];
        out.push_str(&rest[..start]);

        match resolve_macro(name, env, extensions) {
            Some(value) => {
                out.push_str(&value);
                rest = &after[len + 1..];
            }
            None => {
                out.push(MACRO_SEP);
                out.push_str(name);
                // Closing delimiter may open the next token
                rest = &after[len..];
            }
        }
    }

    out
}

fn resolve_macro(name: &str, env: &dyn Environment, extensions: &[(String, String)]) -> Option<String> {
    if name.is_empty() {
        return None;
    }

    if let Some(value) = time_macro(name, env.now()) {
        return Some(value);
    }

    if let Some((_, value)) = extensions
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        return Some(value.clone());
    }

    env.var(name)
}

fn time_macro(name: &str, now: NaiveDateTime) -> Option<String> {
    let format = match name.to_ascii_lowercase().as_str() {
        "time" => "%H%M%S",
        "date" => "%Y-%m-%d",
        "timestamp" => "%Y-%m-%d %H%M%S",
        "weekday" => "%A",
        "day" => "%d",
        "month" => "%m",
        "week" => "%V",
        "year" => "%Y",
        "hour" => "%H",
        "min" => "%M",
        "sec" => "%S",
        _ => return None,
    };
    Some(now.format(format).to_string())
}

/// Trim leading whitespace and trailing spaces
///
/// Other trailing whitespace may be part of a file name and is kept.
fn trim_phrase(phrase: &str) -> &str {
    phrase.trim_start().trim_end_matches(' ')
}

/// Split `[Name]rest` into its volume name and remaining path
fn split_volume(path: &str) -> Option<(&str, &str)> {
    let inner = path.strip_prefix('[')?;
    let end = inner.find(']')?;
    let name = &inner[..end];
    if name.is_empty() {
        return None;
    }
    let rest = inner[end + 1..].trim_start_matches(['/', MAIN_SEPARATOR]);
    Some((name, rest))
}

/// Display form for a volume that is not mounted
fn volume_placeholder(name: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("[{name}]")
    } else {
        format!("[{name}]{MAIN_SEPARATOR}{rest}")
    }
}

fn join(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches(['/', MAIN_SEPARATOR]);
    let tail = tail.trim_start_matches(['/', MAIN_SEPARATOR]);
    match (base.is_empty(), tail.is_empty()) {
        (true, true) => MAIN_SEPARATOR.to_string(),
        (false, true) => base.to_string(),
        (_, false) => format!("{base}{MAIN_SEPARATOR}{tail}"),
    }
}

fn strip_trailing_separator(mut path: String) -> String {
    if path.len() > 1 && path.ends_with(['/', MAIN_SEPARATOR]) {
        path.pop();
    }
    path
}
