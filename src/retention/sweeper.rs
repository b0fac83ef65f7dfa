use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::{sweep_once, SweeperTask};
use crate::error::Result;

/// Lifecycle of a sweeper; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Idle,
    Running,
    Stopped,
}

enum Worker {
    Idle,
    Running {
        stop_tx: Sender<()>,
        thread: JoinHandle<()>,
    },
    Stopped,
}

#[derive(Debug, Default)]
struct SweepStats {
    iterations: AtomicU64,
    deleted: AtomicU64,
}

/// Background thread deleting expired files for one directory
///
/// Each iteration waits `scan_interval` (returning early on stop), then
/// runs one pass. A pass in progress is never interrupted; `stop` waits for
/// it to finish.
pub struct RetentionSweeper {
    task: SweeperTask,
    worker: Mutex<Worker>,
    stats: Arc<SweepStats>,
}

impl std::fmt::Debug for RetentionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionSweeper")
            .field("task", &self.task)
            .field("state", &self.state())
            .field("iterations", &self.iterations())
            .finish()
    }
}

impl RetentionSweeper {
    pub fn new(task: SweeperTask) -> Self {
        Self {
            task,
            worker: Mutex::new(Worker::Idle),
            stats: Arc::new(SweepStats::default()),
        }
    }

    pub fn task(&self) -> &SweeperTask {
        &self.task
    }

    pub fn state(&self) -> SweeperState {
        match *self.worker.lock().unwrap_or_else(PoisonError::into_inner) {
            Worker::Idle => SweeperState::Idle,
            Worker::Running { .. } => SweeperState::Running,
            Worker::Stopped => SweeperState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SweeperState::Running
    }

    /// Completed sweep passes
    pub fn iterations(&self) -> u64 {
        self.stats.iterations.load(Ordering::SeqCst)
    }

    /// Files deleted over the sweeper's lifetime
    pub fn deleted_total(&self) -> u64 {
        self.stats.deleted.load(Ordering::SeqCst)
    }

    /// Spawn the worker thread
    ///
    /// Returns `Ok(false)` if the sweeper is already running or was stopped.
    pub fn start(&self) -> Result<bool> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*worker, Worker::Idle) {
            return Ok(false);
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let task = self.task.clone();
        let stats = Arc::clone(&self.stats);

        let thread = thread::Builder::new()
            .name("logwarden-sweeper".into())
            .spawn(move || {
                tracing::debug!(dir = %task.dir.display(), "Retention sweeper started");
                loop {
                    match stop_rx.recv_timeout(task.scan_interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let report = sweep_once(&task.dir, task.retention, task.recursive);
                    stats
                        .deleted
                        .fetch_add(report.deleted as u64, Ordering::SeqCst);
                    stats.iterations.fetch_add(1, Ordering::SeqCst);
                    if report.deleted > 0 || report.failed > 0 {
                        tracing::debug!(
                            dir = %task.dir.display(),
                            scanned = report.scanned,
                            deleted = report.deleted,
                            failed = report.failed,
                            "Retention pass finished"
                        );
                    }
                }
                tracing::debug!(dir = %task.dir.display(), "Retention sweeper stopped");
            })?;

        *worker = Worker::Running { stop_tx, thread };
        Ok(true)
    }

    /// Signal the worker and wait for it to exit; idempotent
    pub fn stop(&self) {
        let previous = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *worker, Worker::Stopped)
        };

        if let Worker::Running { stop_tx, thread } = previous {
            let _ = stop_tx.send(());
            if thread.join().is_err() {
                tracing::error!(dir = %self.task.dir.display(), "Retention sweeper thread panicked");
            }
        }
    }
}

impl Drop for RetentionSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::touch;
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn test_deletes_expired_within_interval() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.log");
        let fresh = temp_dir.path().join("fresh.log");
        touch(&old, Duration::from_secs(3600));
        touch(&fresh, Duration::ZERO);

        let task = SweeperTask::new(temp_dir.path(), Duration::from_secs(60))
            .with_scan_interval(Duration::from_millis(50));
        let sweeper = RetentionSweeper::new(task);
        assert!(sweeper.start().unwrap());

        assert!(wait_until(Duration::from_secs(5), || !old.exists()));
        assert!(wait_until(Duration::from_secs(5), || sweeper.iterations() >= 2));
        assert!(fresh.exists());
        assert_eq!(sweeper.deleted_total(), 1);
        sweeper.stop();
    }

    #[test]
    fn test_start_twice_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let sweeper = RetentionSweeper::new(SweeperTask::new(temp_dir.path(), Duration::ZERO));

        assert_eq!(sweeper.state(), SweeperState::Idle);
        assert!(sweeper.start().unwrap());
        assert!(!sweeper.start().unwrap());
        assert!(sweeper.is_running());
    }

    #[test]
    fn test_stop_is_prompt_and_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let task = SweeperTask::new(temp_dir.path(), Duration::ZERO)
            .with_scan_interval(Duration::from_secs(3600));
        let sweeper = RetentionSweeper::new(task);
        sweeper.start().unwrap();

        let started = Instant::now();
        sweeper.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sweeper.state(), SweeperState::Stopped);
        assert_eq!(sweeper.iterations(), 0);

        sweeper.stop();
        assert!(!sweeper.start().unwrap());
        assert_eq!(sweeper.state(), SweeperState::Stopped);
    }
}
