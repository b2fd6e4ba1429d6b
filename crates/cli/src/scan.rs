//! Folder statistics collected through the traverser

use rts_core::{
    DirInfo, Error, ErrorDecision, ErrorHandler, FileInfo, LinkDecision, SymlinkInfo,
    TraverserCallback,
};
use tracing::warn;

/// Retries before an error is ignored
pub const MAX_RETRIES: usize = 3;

/// Counts collected by a scan
#[derive(Debug, Default)]
pub struct ScanStats {
    pub files: u64,
    pub dirs: u64,
    pub symlinks: u64,
    pub total_bytes: u64,
    /// Errors given up on
    pub errors: Vec<String>,
    follow_symlinks: bool,
}

impl ScanStats {
    pub fn new(follow_symlinks: bool) -> Self {
        Self {
            follow_symlinks,
            ..Default::default()
        }
    }

    fn decide(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
        if retry_number < MAX_RETRIES {
            warn!("{} (retry {})", err, retry_number + 1);
            return ErrorDecision::Retry;
        }
        self.errors.push(err.to_string());
        ErrorDecision::Ignore
    }
}

impl ErrorHandler for ScanStats {
    fn on_dir_error(&mut self, err: &Error, retry_number: usize) -> ErrorDecision {
        self.decide(err, retry_number)
    }

    fn on_item_error(&mut self, err: &Error, retry_number: usize, item_name: &str) -> ErrorDecision {
        if matches!(err, Error::DataCorruption(_)) {
            // Never retried
            warn!("Skipping corrupt entry: {}", err);
            self.errors.push(err.to_string());
            return ErrorDecision::Ignore;
        }
        if retry_number == 0 {
            warn!("Problem with {:?}", item_name);
        }
        self.decide(err, retry_number)
    }
}

impl TraverserCallback for ScanStats {
    fn on_file(&mut self, file: &FileInfo) {
        self.files += 1;
        self.total_bytes += file.file_size;
    }

    fn on_symlink(&mut self, _link: &SymlinkInfo) -> LinkDecision {
        self.symlinks += 1;
        if self.follow_symlinks {
            LinkDecision::Follow
        } else {
            LinkDecision::Skip
        }
    }

    fn on_dir(&mut self, _dir: &DirInfo) -> Option<Box<dyn TraverserCallback + '_>> {
        self.dirs += 1;
        Some(Box::new(self))
    }
}
