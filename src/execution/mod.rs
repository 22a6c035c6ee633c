//! Batch conversion with configurable parallelism.
//!
//! This module sits "above" [`crate::ingestion`] and provides:
//!
//! - Conversion of many exports on a dedicated rayon pool (one thread by default, which
//!   keeps the run sequential)
//! - Directory discovery of `*.csv` exports via `walkdir`
//! - Real-time metrics + observer hooks for monitoring
//!
//! Each file is an independent conversion; a failing file never stops the batch.

mod observer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{ConversionError, ConversionResult};
use crate::ingestion::{ConversionStats, ConvertOptions, convert_from_path};

pub use observer::{
    BatchEvent, BatchMetrics, BatchMetricsSnapshot, BatchObserver, StdErrBatchObserver, TracingBatchObserver,
};

/// Configuration for the [`BatchConverter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { num_threads: Some(1) }
    }
}

/// One export to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub term: String,
}

impl BatchJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, term: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            term: term.into(),
        }
    }
}

/// What happened to one job.
#[derive(Debug)]
pub struct BatchItem {
    pub job: BatchJob,
    pub result: ConversionResult<ConversionStats>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Converts many exports on its own thread pool.
pub struct BatchConverter {
    pool: ThreadPool,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<BatchMetrics>,
}

impl BatchConverter {
    /// Create a converter with the given options.
    ///
    /// Fails with [`ConversionError::Batch`] if `num_threads == Some(0)` or the pool cannot be built.
    pub fn new(opts: BatchOptions) -> ConversionResult<Self> {
        if opts.num_threads == Some(0) {
            return Err(ConversionError::Batch {
                message: "num_threads must be > 0 when set".to_string(),
            });
        }
        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| ConversionError::Batch {
                message: format!("failed to build thread pool: {e}"),
            })?;

        Ok(Self {
            pool,
            observer: None,
            metrics: Arc::new(BatchMetrics::new()),
        })
    }

    /// Attach an observer for batch events.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time batch metrics.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Convert every job. Items come back in job order.
    pub fn convert_files(&self, jobs: &[BatchJob], options: &ConvertOptions) -> Vec<BatchItem> {
        self.pool.install(|| self.convert_files_impl(jobs, options))
    }

    fn convert_files_impl(&self, jobs: &[BatchJob], options: &ConvertOptions) -> Vec<BatchItem> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(BatchEvent::RunStarted { files: jobs.len() });

        let items = jobs
            .par_iter()
            .map(|job| {
                self.metrics.on_file_start();
                self.emit(BatchEvent::FileStarted {
                    path: job.input.clone(),
                });

                let result = convert_from_path(&job.input, Some(&job.output), &job.term, options)
                    .map(|report| report.stats);
                let students = result.as_ref().map(|s| s.students).unwrap_or(0);

                self.metrics.on_file_end(result.is_ok(), students);
                self.emit(BatchEvent::FileFinished {
                    path: job.input.clone(),
                    success: result.is_ok(),
                    students,
                });
                BatchItem {
                    job: job.clone(),
                    result,
                }
            })
            .collect::<Vec<_>>();

        self.metrics.end_run(start.elapsed());
        self.emit(BatchEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        items
    }

    /// Convert every `*.csv` under `input_dir` into `output_dir/<stem>.json`, using the file
    /// stem as the term label. With `recursive`, subdirectories are mirrored under `output_dir`.
    pub fn convert_directory(
        &self,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        recursive: bool,
        options: &ConvertOptions,
    ) -> ConversionResult<Vec<BatchItem>> {
        let output_dir = output_dir.as_ref();
        let jobs = plan_directory(input_dir.as_ref(), output_dir, recursive)?;

        for parent in jobs.iter().filter_map(|j| j.output.parent()) {
            fs::create_dir_all(parent).map_err(|source| ConversionError::OutputWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(self.convert_files(&jobs, options))
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// Jobs for every `*.csv` export under `input_dir`, sorted by input path.
pub fn plan_directory(input_dir: &Path, output_dir: &Path, recursive: bool) -> ConversionResult<Vec<BatchJob>> {
    if !input_dir.is_dir() {
        return Err(ConversionError::MissingFile {
            path: input_dir.to_path_buf(),
        });
    }

    let walker = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut jobs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => ConversionError::Io(io),
            None => ConversionError::Batch {
                message: "filesystem loop while walking input directory".to_string(),
            },
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_csv(path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let relative_parent = path
            .parent()
            .and_then(|p| p.strip_prefix(input_dir).ok())
            .unwrap_or_else(|| Path::new(""));
        jobs.push(BatchJob::new(
            path,
            output_dir.join(relative_parent).join(format!("{stem}.json")),
            stem,
        ));
    }
    jobs.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(jobs)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        let err = BatchConverter::new(BatchOptions { num_threads: Some(0) }).err();
        assert!(matches!(err, Some(ConversionError::Batch { .. })));
    }

    #[test]
    fn plan_mirrors_subdirectories_only_when_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("3B")).unwrap();
        fs::write(input.join("T1.csv"), "x").unwrap();
        fs::write(input.join("notes.txt"), "x").unwrap();
        fs::write(input.join("3B").join("T2.CSV"), "x").unwrap();
        let out = dir.path().join("out");

        let flat = plan_directory(&input, &out, false).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].term, "T1");
        assert_eq!(flat[0].output, out.join("T1.json"));

        let deep = plan_directory(&input, &out, true).unwrap();
        let outputs: Vec<_> = deep.iter().map(|j| j.output.clone()).collect();
        assert_eq!(outputs, vec![out.join("3B").join("T2.json"), out.join("T1.json")]);
    }

    #[test]
    fn missing_input_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = plan_directory(&dir.path().join("nope"), dir.path(), false).unwrap_err();
        assert!(matches!(err, ConversionError::MissingFile { .. }));
    }
}
