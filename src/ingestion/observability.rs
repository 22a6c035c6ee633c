use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConversionError;

use super::reader::SkippedRow;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (conversion failed).
    Error,
    /// Critical error (missing input, unwritable output, other I/O failures).
    Critical,
}

/// Severity assigned to a failed conversion.
pub fn severity_for_error(e: &ConversionError) -> ConversionSeverity {
    match e {
        ConversionError::MissingFile { .. }
        | ConversionError::OutputWrite { .. }
        | ConversionError::Io(_) => ConversionSeverity::Critical,
        ConversionError::Format { .. }
        | ConversionError::EmptyData { .. }
        | ConversionError::Encoding { .. }
        | ConversionError::Json(_)
        | ConversionError::Container { .. }
        | ConversionError::Batch { .. } => ConversionSeverity::Error,
    }
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Input path, or `<memory>` for in-memory text.
    pub source: String,
    /// Destination path, if the conversion writes one.
    pub output: Option<PathBuf>,
    /// Term label the conversion was asked for.
    pub term: String,
}

/// Stats reported on successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStats {
    /// Data rows read from the table (after malformed rows were dropped).
    pub rows_read: usize,
    /// Students written to the container.
    pub students: usize,
    /// Rows dropped by the reader or the assembler.
    pub rows_skipped: usize,
    /// Delimiter the detector selected.
    pub delimiter: u8,
}

/// Observer interface for conversion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. The pipeline itself never logs
/// through global state; everything goes through the observer it was given.
pub trait ConversionObserver: Send + Sync {
    /// Called once per dropped row.
    fn on_row_skipped(&self, _ctx: &ConversionContext, _row: &SkippedRow) {}

    /// Called when conversion succeeds.
    fn on_success(&self, _ctx: &ConversionContext, _stats: ConversionStats) {}

    /// Called when conversion fails.
    fn on_failure(&self, _ctx: &ConversionContext, _severity: ConversionSeverity, _error: &ConversionError) {}

    /// Called when a conversion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ConversionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ConversionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ConversionObserver for CompositeObserver {
    fn on_row_skipped(&self, ctx: &ConversionContext, row: &SkippedRow) {
        for o in &self.observers {
            o.on_row_skipped(ctx, row);
        }
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs conversion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ConversionObserver for StdErrObserver {
    fn on_row_skipped(&self, ctx: &ConversionContext, row: &SkippedRow) {
        eprintln!(
            "[convert][skip] source={} line={} reason={}",
            ctx.source, row.line, row.reason
        );
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        eprintln!(
            "[convert][ok] source={} term={} students={} skipped={}",
            ctx.source, ctx.term, stats.students, stats.rows_skipped
        );
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        eprintln!(
            "[convert][{:?}] source={} term={} err={}",
            severity, ctx.source, ctx.term, error
        );
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        eprintln!(
            "[ALERT][convert][{:?}] source={} term={} err={}",
            severity, ctx.source, ctx.term, error
        );
    }
}

/// Forwards conversion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn on_row_skipped(&self, ctx: &ConversionContext, row: &SkippedRow) {
        tracing::warn!(source = %ctx.source, line = row.line, reason = %row.reason, "row skipped");
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        tracing::info!(
            source = %ctx.source,
            term = %ctx.term,
            students = stats.students,
            rows_skipped = stats.rows_skipped,
            "conversion finished"
        );
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        tracing::error!(source = %ctx.source, term = %ctx.term, ?severity, %error, "conversion failed");
    }
}

/// Appends conversion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ConversionObserver for FileObserver {
    fn on_row_skipped(&self, ctx: &ConversionContext, row: &SkippedRow) {
        self.append_line(&format!(
            "{} skip source={} line={} reason={}",
            unix_ts(),
            ctx.source,
            row.line,
            row.reason
        ));
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.append_line(&format!(
            "{} ok source={} term={} students={} skipped={}",
            unix_ts(),
            ctx.source,
            ctx.term,
            stats.students,
            stats.rows_skipped
        ));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.append_line(&format!(
            "{} fail severity={:?} source={} term={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            ctx.term,
            error
        ));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} source={} term={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            ctx.term,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
