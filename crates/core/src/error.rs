//! Error taxonomy shared by the resolver, the traverser and the monitor

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    /// Opening a directory for enumeration
    OpenDir,
    /// Reading the next entry of an open directory
    ReadDir,
    /// Querying item attributes without following symlinks
    Stat,
    /// Querying the attributes of a symlink target
    ResolveSymlink,
    /// Looking up the process working directory
    CurrentDir,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsOp::OpenDir => "Cannot open directory",
            FsOp::ReadDir => "Cannot enumerate directory",
            FsOp::Stat => "Cannot read file attributes of",
            FsOp::ResolveSymlink => "Cannot resolve symbolic link",
            FsOp::CurrentDir => "Cannot get current working directory",
        };
        f.write_str(msg)
    }
}

/// Errors produced by rts-core
#[derive(Debug, Error)]
pub enum Error {
    /// An OS call failed
    #[error("{op} \"{}\": {source}", path.display())]
    FileSystem {
        op: FsOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory listing returned an item without a name
    #[error("Data corruption; item with empty name in directory \"{}\"", .0.display())]
    DataCorruption(PathBuf),

    /// Invalid input supplied by the caller
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Build a filesystem error for `op` on `path`
    pub fn fs(op: FsOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileSystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// The failed operation, if this is a filesystem error
    pub fn op(&self) -> Option<FsOp> {
        match self {
            Error::FileSystem { op, .. } => Some(*op),
            _ => None,
        }
    }
}
