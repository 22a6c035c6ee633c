use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted by the batch converter.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    RunStarted { files: usize },
    FileStarted { path: PathBuf },
    FileFinished { path: PathBuf, success: bool, students: usize },
    RunFinished {
        elapsed: Duration,
        metrics: BatchMetricsSnapshot,
    },
}

/// Observer hook for batch events.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// A simple stderr logger for batch events.
#[derive(Debug, Default)]
pub struct StdErrBatchObserver;

impl BatchObserver for StdErrBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        eprintln!("[batch] {event:?}");
    }
}

/// Forwards batch events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingBatchObserver;

impl BatchObserver for TracingBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        match event {
            BatchEvent::RunStarted { files } => tracing::info!(files, "batch started"),
            BatchEvent::FileStarted { path } => tracing::debug!(path = %path.display(), "file started"),
            BatchEvent::FileFinished {
                path,
                success,
                students,
            } => tracing::debug!(path = %path.display(), success, students, "file finished"),
            BatchEvent::RunFinished { elapsed, metrics } => {
                tracing::info!(?elapsed, %metrics, "batch finished")
            }
        }
    }
}

/// Live counters for a batch run.
///
/// The converter updates these while files are processed; callers can snapshot them at any time.
#[derive(Debug)]
pub struct BatchMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    files_started: AtomicU64,
    files_succeeded: AtomicU64,
    files_failed: AtomicU64,
    students_written: AtomicU64,

    active_files: AtomicUsize,
    max_active_files: AtomicUsize,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            files_started: AtomicU64::new(0),
            files_succeeded: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            students_written: AtomicU64::new(0),
            active_files: AtomicUsize::new(0),
            max_active_files: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.files_started.store(0, Ordering::SeqCst);
        self.files_succeeded.store(0, Ordering::SeqCst);
        self.files_failed.store(0, Ordering::SeqCst);
        self.students_written.store(0, Ordering::SeqCst);
        self.active_files.store(0, Ordering::SeqCst);
        self.max_active_files.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_file_start(&self) {
        let _ = self.files_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_files.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_files, now);
    }

    pub fn on_file_end(&self, success: bool, students: usize) {
        if success {
            let _ = self.files_succeeded.fetch_add(1, Ordering::SeqCst);
            let _ = self.students_written.fetch_add(students as u64, Ordering::SeqCst);
        } else {
            let _ = self.files_failed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.active_files.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        BatchMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            files_started: self.files_started.load(Ordering::SeqCst),
            files_succeeded: self.files_succeeded.load(Ordering::SeqCst),
            files_failed: self.files_failed.load(Ordering::SeqCst),
            students_written: self.students_written.load(Ordering::SeqCst),
            max_active_files: self.max_active_files.load(Ordering::SeqCst),
        }
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`BatchMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub files_started: u64,
    pub files_succeeded: u64,
    pub files_failed: u64,
    pub students_written: u64,
    pub max_active_files: usize,
}

impl fmt::Display for BatchMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, files={}/{} ok, failed={}, students={}, max_active_files={}, elapsed={:?}",
            self.run_id,
            self.files_succeeded,
            self.files_started,
            self.files_failed,
            self.students_written,
            self.max_active_files,
            self.elapsed
        )
    }
}
