//! Log file retention
//!
//! A `RetentionSweeper` runs `sweep_once` on a background thread at a fixed
//! interval. The `SweeperSupervisor` guarantees at most one sweeper per
//! directory in the process.

mod supervisor;
mod sweeper;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use walkdir::WalkDir;

pub use supervisor::SweeperSupervisor;
pub use sweeper::{RetentionSweeper, SweeperState};

use crate::logger_config::{LoggerConfig, DEFAULT_SWEEP_INTERVAL};

/// What a sweeper enforces and how often
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperTask {
    pub dir: PathBuf,
    /// Files whose mtime is older than this are deleted
    pub retention: Duration,
    pub scan_interval: Duration,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl SweeperTask {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            retention,
            scan_interval: DEFAULT_SWEEP_INTERVAL,
            recursive: true,
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Task for a logger's output directory, if it has one
    ///
    /// The whole output directory is swept, subdirectories included, so
    /// loggers sharing a root share one sweeper.
    pub fn for_logger(config: &LoggerConfig) -> Option<Self> {
        config.output_dir.as_ref().map(|dir| {
            Self::new(dir.clone(), config.retention).with_scan_interval(config.sweep_interval)
        })
    }
}

/// Outcome of one pass over a directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files examined
    pub scanned: usize,
    pub deleted: usize,
    /// Files that could not be inspected or removed
    pub failed: usize,
}

/// Delete regular, non-hidden files under `dir` older than `retention`
///
/// Failures are logged and skipped. A file that disappears between the scan
/// and the delete is not an error and is not counted as deleted.
pub fn sweep_once(dir: &Path, retention: Duration, recursive: bool) -> SweepReport {
    let mut report = SweepReport::default();
    if !dir.exists() {
        return report;
    }

    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read log directory entry");
                report.failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(e)) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Cannot read file mtime");
                report.failed += 1;
                continue;
            }
            Err(e) => {
                if is_not_found(e.io_error()) {
                    continue;
                }
                tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat log file");
                report.failed += 1;
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(path) {
            Ok(()) => {
                report.deleted += 1;
                tracing::info!(path = %path.display(), "Deleted expired log file");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired log file");
                report.failed += 1;
            }
        }
    }

    report
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

fn is_not_found(error: Option<&io::Error>) -> bool {
    error.map(|e| e.kind() == io::ErrorKind::NotFound).unwrap_or(false)
}
