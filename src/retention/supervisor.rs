use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{RetentionSweeper, SweeperTask};
use crate::error::Result;

/// Owns every running sweeper, keyed by canonical directory
#[derive(Debug, Default)]
pub struct SweeperSupervisor {
    sweepers: Mutex<HashMap<PathBuf, Arc<RetentionSweeper>>>,
}

fn canonical(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

impl SweeperSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sweeper for `task.dir` unless one is already running there
    ///
    /// Returns `Ok(false)` and logs a warning for a duplicate.
    pub fn start(&self, task: SweeperTask) -> Result<bool> {
        let key = canonical(&task.dir);
        let mut sweepers = self.sweepers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = sweepers.get(&key) {
            if existing.is_running() {
                tracing::warn!(dir = %key.display(), "Retention sweeper already running for directory");
                return Ok(false);
            }
        }

        let sweeper = Arc::new(RetentionSweeper::new(task));
        sweeper.start()?;
        tracing::info!(
            dir = %key.display(),
            retention_secs = sweeper.task().retention.as_secs(),
            interval_secs = sweeper.task().scan_interval.as_secs(),
            "Started retention sweeper"
        );
        sweepers.insert(key, sweeper);
        Ok(true)
    }

    /// Stop the sweeper for `dir`; false if none was registered
    pub fn stop(&self, dir: &Path) -> bool {
        let removed = self
            .sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&canonical(dir));
        match removed {
            Some(sweeper) => {
                sweeper.stop();
                true
            }
            None => false,
        }
    }

    /// Stop every sweeper and wait for their threads
    pub fn stop_all(&self) {
        let drained: Vec<_> = self
            .sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (dir, sweeper) in drained {
            sweeper.stop();
            tracing::debug!(dir = %dir.display(), "Stopped retention sweeper");
        }
    }

    pub fn is_running(&self, dir: &Path) -> bool {
        self.get(dir).map(|s| s.is_running()).unwrap_or(false)
    }

    /// Number of sweepers currently running
    pub fn active_count(&self) -> usize {
        self.sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.is_running())
            .count()
    }

    pub fn get(&self, dir: &Path) -> Option<Arc<RetentionSweeper>> {
        self.sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&canonical(dir))
            .cloned()
    }
}

impl Drop for SweeperSupervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::touch;
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_duplicate_start_runs_one_worker() {
        let temp_dir = TempDir::new().unwrap();
        let supervisor = SweeperSupervisor::new();
        let task = SweeperTask::new(temp_dir.path(), Duration::ZERO)
            .with_scan_interval(Duration::from_millis(50));

        assert!(supervisor.start(task.clone()).unwrap());
        assert!(!supervisor.start(task).unwrap());
        assert_eq!(supervisor.active_count(), 1);
        assert!(supervisor.is_running(temp_dir.path()));
    }

    #[test]
    fn test_equivalent_paths_share_a_sweeper() {
        let temp_dir = TempDir::new().unwrap();
        let supervisor = SweeperSupervisor::new();
        let dotted = temp_dir.path().join(".");

        assert!(supervisor
            .start(SweeperTask::new(temp_dir.path(), Duration::ZERO))
            .unwrap());
        assert!(!supervisor
            .start(SweeperTask::new(&dotted, Duration::ZERO))
            .unwrap());
        assert_eq!(supervisor.active_count(), 1);
    }

    #[test]
    fn test_two_starts_delete_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let supervisor = SweeperSupervisor::new();
        let task = SweeperTask::new(temp_dir.path(), Duration::ZERO)
            .with_scan_interval(Duration::from_millis(50));
        supervisor.start(task.clone()).unwrap();
        supervisor.start(task).unwrap();

        let file = temp_dir.path().join("svc.log");
        touch(&file, Duration::from_secs(1));

        let sweeper = supervisor.get(temp_dir.path()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while file.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let passes = sweeper.iterations();
        while sweeper.iterations() < passes + 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert!(!file.exists());
        assert_eq!(sweeper.deleted_total(), 1);
        assert_eq!(supervisor.active_count(), 1);
    }

    #[test]
    fn test_stop_and_restart() {
        let temp_dir = TempDir::new().unwrap();
        let supervisor = SweeperSupervisor::new();
        let task = SweeperTask::new(temp_dir.path(), Duration::ZERO);

        supervisor.start(task.clone()).unwrap();
        assert!(supervisor.stop(temp_dir.path()));
        assert!(!supervisor.stop(temp_dir.path()));
        assert_eq!(supervisor.active_count(), 0);

        assert!(supervisor.start(task).unwrap());
        supervisor.stop_all();
        assert_eq!(supervisor.active_count(), 0);
    }
}
