//! One-shot recursive directory traversal
//!
//! Walks a folder tree depth-first and reports every item to a
//! [`TraverserCallback`]. Nothing is filtered here: plain files, pipes and
//! devices all arrive through `on_file`, directories through `on_dir`.
//!
//! Failures never abort the walk. Each one is handed to the callback's
//! [`ErrorHandler`], which decides to retry the failed operation or to skip
//! the affected item or directory. There is no built-in retry limit.

use crate::error::{Error, FsOp};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Platform file identity (device + inode)
///
/// Stays stable across renames, and hard links share it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    pub volume: u64,
    pub inode: u64,
}

impl FileId {
    /// True if the platform provided no identity
    pub fn is_null(&self) -> bool {
        self.volume == 0 && self.inode == 0
    }
}

/// A symbolic link as found in its parent directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkInfo {
    pub item_name: String,
    pub full_path: PathBuf,
    /// Modification time of the link itself (Unix seconds)
    pub mod_time: i64,
}

/// A file, or a followed symlink pointing to one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub item_name: String,
    pub full_path: PathBuf,
    pub file_size: u64,
    /// Unix seconds
    pub mod_time: i64,
    pub file_id: FileId,
    /// Set when this file was reached through a followed symlink
    pub symlink_info: Option<SymlinkInfo>,
}

/// A directory about to be entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub item_name: String,
    pub full_path: PathBuf,
}

/// What to do with a symlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    Follow,
    Skip,
}

/// What to do after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    Retry,
    Ignore,
}

/// Error policy for a traversal
pub trait ErrorHandler {
    /// A directory could not be opened or enumerated
    ///
    /// `Ignore` abandons the directory.
    fn on_dir_error(&mut self, err: &Error, retry_number: usize) -> ErrorDecision;

    /// A single item could not be examined
    ///
    /// `Ignore` skips the item.
    fn on_item_error(&mut self, err: &Error, retry_number: usize, item_name: &str) -> ErrorDecision;
}

/// Receives the items of a traversal
pub trait TraverserCallback: ErrorHandler {
    fn on_file(&mut self, file: &FileInfo);

    fn on_symlink(&mut self, link: &SymlinkInfo) -> LinkDecision;

    /// Return a callback for the directory's contents, or `None` to skip it
    ///
    /// The returned callback is dropped as soon as the subtree is done.
    fn on_dir(&mut self, dir: &DirInfo) -> Option<Box<dyn TraverserCallback + '_>>;
}

impl<T: ErrorHandler + ?Sized> ErrorHandler for &mut T {
    fn on_dir_error(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
        (**self).on_dir_error(err, retry_number)
    }

    fn on_item_error(&mut self, err: &Error, retry_number: usize, item_name: &str) -> ErrorDecision {
        (**self).on_item_error(err, retry_number, item_name)
    }
}

impl<T: TraverserCallback + ?Sized> TraverserCallback for &mut T {
    fn on_file(&mut self, file: &FileInfo) {
        (**self).on_file(file)
    }

    fn on_symlink(&mut self, link: &SymlinkInfo) -> LinkDecision {
        (**self).on_symlink(link)
    }

    fn on_dir(&mut self, dir: &DirInfo) -> Option<Box<dyn TraverserCallback + '_>> {
        (**self).on_dir(dir)
    }
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Regular file or any other non-directory object
    File,
    Dir,
    Symlink,
}

/// Attributes of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStatus {
    pub kind: ItemKind,
    pub size: u64,
    pub mod_time: i64,
    pub file_id: FileId,
}

/// Filesystem primitives used by the traverser
pub trait FileSystem {
    type Entries: Iterator<Item = io::Result<OsString>>;

    /// Open a directory and enumerate its entry names
    fn open_dir(&self, path: &Path) -> io::Result<Self::Entries>;

    /// Attributes without following symlinks
    fn symlink_status(&self, path: &Path) -> io::Result<ItemStatus>;

    /// Attributes of the final symlink target
    fn target_status(&self, path: &Path) -> io::Result<ItemStatus>;
}

/// The local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    type Entries = std::iter::Map<fs::ReadDir, fn(io::Result<fs::DirEntry>) -> io::Result<OsString>>;

    fn open_dir(&self, path: &Path) -> io::Result<Self::Entries> {
        fn entry_name(entry: io::Result<fs::DirEntry>) -> io::Result<OsString> {
            entry.map(|e| e.file_name())
        }
        Ok(fs::read_dir(path)?.map(entry_name as fn(_) -> _))
    }

    fn symlink_status(&self, path: &Path) -> io::Result<ItemStatus> {
        fs::symlink_metadata(path).map(|m| status_from_metadata(&m))
    }

    fn target_status(&self, path: &Path) -> io::Result<ItemStatus> {
        fs::metadata(path).map(|m| status_from_metadata(&m))
    }
}

fn status_from_metadata(meta: &fs::Metadata) -> ItemStatus {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        ItemKind::Symlink
    } else if file_type.is_dir() {
        ItemKind::Dir
    } else {
        ItemKind::File
    };

    ItemStatus {
        kind,
        size: if kind == ItemKind::File { meta.len() } else { 0 },
        mod_time: mod_time(meta),
        file_id: file_id(meta),
    }
}

#[cfg(unix)]
fn mod_time(meta: &fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.mtime()
}

#[cfg(not(unix))]
fn mod_time(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn file_id(meta: &fs::Metadata) -> FileId {
    use std::os::unix::fs::MetadataExt;
    FileId {
        volume: meta.dev(),
        inode: meta.ino(),
    }
}

#[cfg(not(unix))]
fn file_id(_meta: &fs::Metadata) -> FileId {
    FileId::default()
}

/// Traverse `root` recursively, reporting everything to `callback`
pub fn traverse_folder<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
    callback: &mut dyn TraverserCallback,
) {
    debug!("Traversing {}", root.display());
    traverse_dir(fs, root, callback);
}

fn traverse_dir<F: FileSystem + ?Sized>(fs: &F, dir: &Path, cb: &mut dyn TraverserCallback) {
    let Some(mut entries) = try_reporting_dir_error(cb, || {
        fs.open_dir(dir).map_err(|e| Error::fs(FsOp::OpenDir, dir, e))
    }) else {
        return;
    };

    loop {
        let next = try_reporting_dir_error(cb, || {
            entries
                .next()
                .transpose()
                .map_err(|e| Error::fs(FsOp::ReadDir, dir, e))
        });
        let name = match next {
            Some(Some(name)) => name,
            // End of listing
            Some(None) => return,
            // Enumeration abandoned
            None => return,
        };

        if name == "." || name == ".." {
            continue;
        }
        if name.is_empty() {
            // Not retryable: the same listing would come back
            let err = Error::DataCorruption(dir.to_path_buf());
            warn!("{}", err);
            cb.on_item_error(&err, 0, "");
            continue;
        }

        let item_path = dir.join(&name);
        let item_name = name.to_string_lossy().into_owned();

        let Some(status) = try_reporting_item_error(cb, &item_name, || {
            fs.symlink_status(&item_path)
                .map_err(|e| Error::fs(FsOp::Stat, &item_path, e))
        }) else {
            continue;
        };

        match status.kind {
            ItemKind::Symlink => {
                let link = SymlinkInfo {
                    item_name,
                    full_path: item_path,
                    mod_time: status.mod_time,
                };
                if cb.on_symlink(&link) == LinkDecision::Follow {
                    follow_symlink(fs, link, cb);
                }
            }
            ItemKind::Dir => visit_dir(
                fs,
                DirInfo {
                    item_name,
                    full_path: item_path,
                },
                cb,
            ),
            ItemKind::File => cb.on_file(&FileInfo {
                item_name,
                full_path: item_path,
                file_size: status.size,
                mod_time: status.mod_time,
                file_id: status.file_id,
                symlink_info: None,
            }),
        }
    }
}

fn follow_symlink<F: FileSystem + ?Sized>(fs: &F, link: SymlinkInfo, cb: &mut dyn TraverserCallback) {
    // A broken link is reported, then left to the callback's policy
    let Some(target) = try_reporting_item_error(cb, &link.item_name, || {
        fs.target_status(&link.full_path)
            .map_err(|e| Error::fs(FsOp::ResolveSymlink, &link.full_path, e))
    }) else {
        return;
    };

    if target.kind == ItemKind::Dir {
        visit_dir(
            fs,
            DirInfo {
                item_name: link.item_name,
                full_path: link.full_path,
            },
            cb,
        );
    } else {
        cb.on_file(&FileInfo {
            item_name: link.item_name.clone(),
            full_path: link.full_path.clone(),
            file_size: target.size,
            mod_time: target.mod_time,
            file_id: target.file_id,
            symlink_info: Some(link),
        });
    }
}

fn visit_dir<F: FileSystem + ?Sized>(fs: &F, dir: DirInfo, cb: &mut dyn TraverserCallback) {
    if let Some(mut child) = cb.on_dir(&dir) {
        traverse_dir(fs, &dir.full_path, child.as_mut());
    }
}

fn try_reporting_dir_error<T>(
    cb: &mut dyn TraverserCallback,
    mut op: impl FnMut() -> Result<T>,
) -> Option<T> {
    let mut retry_number = 0;
    loop {
        match op() {
            Ok(value) => return Some(value),
            Err(err) => match cb.on_dir_error(&err, retry_number) {
                ErrorDecision::Retry => retry_number += 1,
                ErrorDecision::Ignore => {
                    debug!("Ignoring: {}", err);
                    return None;
                }
            },
        }
    }
}

fn try_reporting_item_error<T>(
    cb: &mut dyn TraverserCallback,
    item_name: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Option<T> {
    let mut retry_number = 0;
    loop {
        match op() {
            Ok(value) => return Some(value),
            Err(err) => match cb.on_item_error(&err, retry_number, item_name) {
                ErrorDecision::Retry => retry_number += 1,
                ErrorDecision::Ignore => {
                    debug!("Ignoring: {}", err);
                    return None;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Records every callback in order
    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
        files: Vec<FileInfo>,
        errors: Vec<(Option<FsOp>, usize)>,
        follow_links: bool,
        skip_dirs: Vec<String>,
        /// Retries granted before ignoring an error
        max_retries: usize,
    }

    impl Recorder {
        fn count(&self, prefix: &str) -> usize {
            self.log.iter().filter(|l| l.starts_with(prefix)).count()
        }

        fn decide(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
            self.errors.push((err.op(), retry_number));
            if retry_number < self.max_retries {
                ErrorDecision::Retry
            } else {
                ErrorDecision::Ignore
            }
        }
    }

    impl ErrorHandler for Recorder {
        fn on_dir_error(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
            self.decide(err, retry_number)
        }

        fn on_item_error(&mut self, err: &Error, retry_number: usize, _item_name: &str) -> ErrorDecision {
            self.decide(err, retry_number)
        }
    }

    impl TraverserCallback for Recorder {
        fn on_file(&mut self, file: &FileInfo) {
            self.log.push(format!("file:{}", file.item_name));
            self.files.push(file.clone());
        }

        fn on_symlink(&mut self, link: &SymlinkInfo) -> LinkDecision {
            self.log.push(format!("link:{}", link.item_name));
            if self.follow_links {
                LinkDecision::Follow
            } else {
                LinkDecision::Skip
            }
        }

        fn on_dir(&mut self, dir: &DirInfo) -> Option<Box<dyn TraverserCallback + '_>> {
            self.log.push(format!("dir:{}", dir.item_name));
            if self.skip_dirs.contains(&dir.item_name) {
                return None;
            }
            Some(Box::new(Scoped {
                name: dir.item_name.clone(),
                rec: self,
            }))
        }
    }

    /// Child callback that logs when it is released
    struct Scoped<'a> {
        name: String,
        rec: &'a mut Recorder,
    }

    impl Drop for Scoped<'_> {
        fn drop(&mut self) {
            self.rec.log.push(format!("leave:{}", self.name));
        }
    }

    impl ErrorHandler for Scoped<'_> {
        fn on_dir_error(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
            self.rec.on_dir_error(err, retry_number)
        }

        fn on_item_error(&mut self, err: &Error, retry_number: usize, item_name: &str) -> ErrorDecision {
            self.rec.on_item_error(err, retry_number, item_name)
        }
    }

    impl TraverserCallback for Scoped<'_> {
        fn on_file(&mut self, file: &FileInfo) {
            self.rec.on_file(file)
        }

        fn on_symlink(&mut self, link: &SymlinkInfo) -> LinkDecision {
            self.rec.on_symlink(link)
        }

        fn on_dir(&mut self, dir: &DirInfo) -> Option<Box<dyn TraverserCallback + '_>> {
            self.rec.on_dir(dir)
        }
    }

    enum Node {
        Dir(Vec<io::Result<OsString>>),
        File(u64),
        Link(PathBuf),
    }

    /// In-memory filesystem with injectable failures
    #[derive(Default)]
    struct MemFs {
        nodes: HashMap<PathBuf, Node>,
        /// Remaining failures per path for open_dir / symlink_status
        failures: RefCell<HashMap<PathBuf, usize>>,
    }

    impl MemFs {
        fn dir(mut self, path: &str, names: &[&str]) -> Self {
            let entries = names.iter().map(|n| Ok(OsString::from(n))).collect();
            self.nodes.insert(PathBuf::from(path), Node::Dir(entries));
            self
        }

        fn dir_entries(mut self, path: &str, entries: Vec<io::Result<OsString>>) -> Self {
            self.nodes.insert(PathBuf::from(path), Node::Dir(entries));
            self
        }

        fn file(mut self, path: &str, size: u64) -> Self {
            self.nodes.insert(PathBuf::from(path), Node::File(size));
            self
        }

        fn link(mut self, path: &str, target: &str) -> Self {
            self.nodes
                .insert(PathBuf::from(path), Node::Link(PathBuf::from(target)));
            self
        }

        fn failing(self, path: &str, times: usize) -> Self {
            self.failures.borrow_mut().insert(PathBuf::from(path), times);
            self
        }

        fn maybe_fail(&self, path: &Path) -> io::Result<()> {
            let mut failures = self.failures.borrow_mut();
            match failures.get_mut(path) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    Err(io::Error::new(io::ErrorKind::Other, "transient failure"))
                }
                _ => Ok(()),
            }
        }

        fn status_of(&self, path: &Path) -> io::Result<ItemStatus> {
            let kind_size = match self.nodes.get(path) {
                Some(Node::Dir(_)) => (ItemKind::Dir, 0),
                Some(Node::File(size)) => (ItemKind::File, *size),
                Some(Node::Link(_)) => (ItemKind::Symlink, 0),
                None => return Err(io::Error::from(io::ErrorKind::NotFound)),
            };
            Ok(ItemStatus {
                kind: kind_size.0,
                size: kind_size.1,
                mod_time: 1_700_000_000,
                file_id: FileId::default(),
            })
        }
    }

    impl FileSystem for MemFs {
        type Entries = std::vec::IntoIter<io::Result<OsString>>;

        fn open_dir(&self, path: &Path) -> io::Result<Self::Entries> {
            self.maybe_fail(path)?;
            match self.nodes.get(path) {
                Some(Node::Dir(entries)) => Ok(entries
                    .iter()
                    .map(|e| match e {
                        Ok(name) => Ok(name.clone()),
                        Err(err) => Err(io::Error::new(err.kind(), err.to_string())),
                    })
                    .collect::<Vec<_>>()
                    .into_iter()),
                _ => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        }

        fn symlink_status(&self, path: &Path) -> io::Result<ItemStatus> {
            self.maybe_fail(path)?;
            self.status_of(path)
        }

        fn target_status(&self, path: &Path) -> io::Result<ItemStatus> {
            let mut current = path.to_path_buf();
            // Bounded like the OS symlink depth limit
            for _ in 0..40 {
                match self.nodes.get(&current) {
                    Some(Node::Link(target)) => current = target.clone(),
                    _ => return self.status_of(&current),
                }
            }
            Err(io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"))
        }
    }

    fn walk<F: FileSystem>(fs: &F, root: &str, rec: &mut Recorder) {
        traverse_folder(fs, Path::new(root), rec);
    }

    #[test]
    fn test_counts_files_and_dirs_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("c")).unwrap();
        fs::write(root.join("top.txt"), b"12345").unwrap();
        fs::write(root.join("a/one.txt"), b"1").unwrap();
        fs::write(root.join("a/b/two.txt"), b"22").unwrap();
        fs::write(root.join("c/three.txt"), b"333").unwrap();

        let mut rec = Recorder::default();
        traverse_folder(&LocalFs, root, &mut rec);

        assert_eq!(rec.count("file:"), 4);
        assert_eq!(rec.count("dir:"), 3);
        assert!(rec.errors.is_empty());

        let top = rec.files.iter().find(|f| f.item_name == "top.txt").unwrap();
        assert_eq!(top.file_size, 5);
        assert_eq!(top.full_path, root.join("top.txt"));
        assert!(top.symlink_info.is_none());
        #[cfg(unix)]
        assert!(!top.file_id.is_null());
    }

    #[test]
    fn test_reports_modification_time() {
        use filetime::{set_file_mtime, FileTime};

        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("old.txt");
        fs::write(&file, b"old").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

        let mut rec = Recorder::default();
        traverse_folder(&LocalFs, temp_dir.path(), &mut rec);

        assert_eq!(rec.files[0].mod_time, 1_600_000_000);
    }

    #[test]
    fn test_missing_root_goes_through_dir_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut rec = Recorder {
            max_retries: 2,
            ..Recorder::default()
        };
        traverse_folder(&LocalFs, &temp_dir.path().join("missing"), &mut rec);

        assert_eq!(
            rec.errors,
            vec![
                (Some(FsOp::OpenDir), 0),
                (Some(FsOp::OpenDir), 1),
                (Some(FsOp::OpenDir), 2),
            ]
        );
        assert!(rec.log.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_dir_symlink_recurses_like_real_dir() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let root = temp_dir.path().join("root");
        fs::create_dir_all(target.join("sub")).unwrap();
        fs::write(target.join("a.txt"), b"a").unwrap();
        fs::write(target.join("sub/b.txt"), b"b").unwrap();
        fs::create_dir_all(&root).unwrap();
        symlink(&target, root.join("linked")).unwrap();

        let mut direct = Recorder::default();
        traverse_folder(&LocalFs, &target, &mut direct);

        let mut via_link = Recorder {
            follow_links: true,
            ..Recorder::default()
        };
        traverse_folder(&LocalFs, &root, &mut via_link);

        assert_eq!(via_link.count("link:"), 1);
        assert_eq!(via_link.count("dir:"), direct.count("dir:") + 1);
        assert_eq!(via_link.count("file:"), direct.count("file:"));
        assert!(via_link
            .files
            .iter()
            .all(|f| f.full_path.starts_with(root.join("linked"))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_symlink_carries_link_info() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("real.txt"), b"content").unwrap();
        symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();
        symlink(root.join("gone.txt"), root.join("broken.txt")).unwrap();

        let mut rec = Recorder {
            follow_links: true,
            ..Recorder::default()
        };
        traverse_folder(&LocalFs, root, &mut rec);

        let alias = rec.files.iter().find(|f| f.item_name == "alias.txt").unwrap();
        assert_eq!(alias.file_size, 7);
        assert_eq!(alias.symlink_info.as_ref().unwrap().item_name, "alias.txt");

        // Broken link: reported once, then skipped
        assert_eq!(rec.errors, vec![(Some(FsOp::ResolveSymlink), 0)]);
        assert_eq!(rec.count("file:"), 2);
    }

    #[test]
    fn test_skipped_symlinks_are_not_resolved() {
        let fs = MemFs::default()
            .dir("/r", &["l"])
            .link("/r/l", "/nowhere");

        let mut rec = Recorder::default();
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.log, vec!["link:l"]);
        assert!(rec.errors.is_empty());
    }

    #[test]
    fn test_empty_name_reported_once_and_excluded() {
        let fs = MemFs::default()
            .dir("/r", &["a", "", "b", ".", ".."])
            .file("/r/a", 1)
            .file("/r/b", 2);

        let mut rec = Recorder {
            max_retries: 10,
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.count("file:"), 2);
        assert_eq!(rec.errors, vec![(None, 0)]);
    }

    #[test]
    fn test_counts_unaffected_by_retries() {
        let fs = MemFs::default()
            .dir("/r", &["d", "f1", "f2"])
            .dir("/r/d", &["f3"])
            .file("/r/f1", 1)
            .file("/r/f2", 1)
            .file("/r/d/f3", 1)
            .failing("/r/f1", 2)
            .failing("/r/d", 1);

        let mut rec = Recorder {
            max_retries: 5,
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.count("file:"), 3);
        assert_eq!(rec.count("dir:"), 1);
        assert_eq!(
            rec.errors,
            vec![
                // d once, then f1 twice
                (Some(FsOp::Stat), 0),
                (Some(FsOp::Stat), 0),
                (Some(FsOp::Stat), 1),
            ]
        );
    }

    #[test]
    fn test_ignored_item_is_skipped() {
        let fs = MemFs::default()
            .dir("/r", &["bad", "good"])
            .file("/r/bad", 1)
            .file("/r/good", 1)
            .failing("/r/bad", 100);

        let mut rec = Recorder {
            max_retries: 3,
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.log, vec!["file:good"]);
        assert_eq!(rec.errors.len(), 4);
    }

    #[test]
    fn test_enumeration_error_abandons_directory() {
        let fs = MemFs::default()
            .dir_entries(
                "/r",
                vec![
                    Ok(OsString::from("a")),
                    Err(io::Error::new(io::ErrorKind::Other, "bad block")),
                    Ok(OsString::from("b")),
                ],
            )
            .file("/r/a", 1)
            .file("/r/b", 1);

        let mut rec = Recorder::default();
        walk(&fs, "/r", &mut rec);
        assert_eq!(rec.log, vec!["file:a"]);
        assert_eq!(rec.errors, vec![(Some(FsOp::ReadDir), 0)]);

        // Retrying moves on to the next entry
        let mut rec = Recorder {
            max_retries: 1,
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);
        assert_eq!(rec.log, vec!["file:a", "file:b"]);
    }

    #[test]
    fn test_unopenable_subdir_is_abandoned() {
        let fs = MemFs::default()
            .dir("/r", &["d", "f"])
            .dir("/r/d", &["inner"])
            .file("/r/d/inner", 1)
            .file("/r/f", 1);

        struct FailOpen<'a>(&'a MemFs);
        impl FileSystem for FailOpen<'_> {
            type Entries = std::vec::IntoIter<io::Result<OsString>>;
            fn open_dir(&self, path: &Path) -> io::Result<Self::Entries> {
                if path == Path::new("/r/d") {
                    return Err(io::Error::from(io::ErrorKind::PermissionDenied));
                }
                self.0.open_dir(path)
            }
            fn symlink_status(&self, path: &Path) -> io::Result<ItemStatus> {
                self.0.symlink_status(path)
            }
            fn target_status(&self, path: &Path) -> io::Result<ItemStatus> {
                self.0.target_status(path)
            }
        }

        let mut rec = Recorder::default();
        walk(&FailOpen(&fs), "/r", &mut rec);

        assert_eq!(rec.log, vec!["dir:d", "leave:d", "file:f"]);
        assert_eq!(rec.errors, vec![(Some(FsOp::OpenDir), 0)]);
    }

    #[test]
    fn test_declined_dir_is_not_entered() {
        let fs = MemFs::default()
            .dir("/r", &["skip", "keep"])
            .dir("/r/skip", &["x"])
            .dir("/r/keep", &["y"])
            .file("/r/skip/x", 1)
            .file("/r/keep/y", 1);

        let mut rec = Recorder {
            skip_dirs: vec!["skip".to_string()],
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.log, vec!["dir:skip", "dir:keep", "file:y", "leave:keep"]);
    }

    #[test]
    fn test_child_callback_released_after_subtree() {
        let fs = MemFs::default()
            .dir("/r", &["a", "z"])
            .dir("/r/a", &["b"])
            .dir("/r/a/b", &["f"])
            .file("/r/a/b/f", 1)
            .file("/r/z", 1);

        let mut rec = Recorder::default();
        walk(&fs, "/r", &mut rec);

        assert_eq!(
            rec.log,
            vec!["dir:a", "dir:b", "file:f", "leave:b", "leave:a", "file:z"]
        );
    }

    #[test]
    fn test_followed_mem_symlink_to_file() {
        let fs = MemFs::default()
            .dir("/r", &["l"])
            .file("/data", 42)
            .link("/r/l", "/data");

        let mut rec = Recorder {
            follow_links: true,
            ..Recorder::default()
        };
        walk(&fs, "/r", &mut rec);

        assert_eq!(rec.log, vec!["link:l", "file:l"]);
        assert_eq!(rec.files[0].file_size, 42);
        assert!(rec.files[0].symlink_info.is_some());
    }
}
