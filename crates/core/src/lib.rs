//! RTS Core - path resolution and directory traversal for the change monitor
//!
//! This crate provides the filesystem-facing building blocks:
//! - Path phrase resolution (macros, env vars, `~`, volume names)
//! - Injected environment access for deterministic resolution
//! - One-shot recursive directory traversal with retry/ignore error policy
//! - Shared error taxonomy

pub mod env;
pub mod error;
pub mod resolve;
pub mod traverse;

// Re-export main types for convenience
pub use env::{Environment, FixedEnvironment, SystemEnvironment};
pub use error::{Error, FsOp};
pub use resolve::{expand_macros, PathResolver, ResolvedPath};
pub use traverse::{
    traverse_folder, DirInfo, ErrorDecision, ErrorHandler, FileId, FileInfo, FileSystem,
    LinkDecision, LocalFs, SymlinkInfo, TraverserCallback,
};

/// Common result type used throughout rts-core
pub type Result<T> = std::result::Result<T, Error>;
