//! Conversion entrypoint.
//!
//! Most callers should use [`convert`], which runs the whole pipeline
//! (detect delimiter → sanitize → read → assemble → build container → write) and reports the
//! outcome as a `(success, message, json)` triple instead of an error.
//!
//! - [`convert_from_path`] / [`convert_from_str`] return typed errors.
//! - [`build_container`] is the pure in-memory pipeline (no I/O).
//! - If a [`ConversionObserver`] is configured, skipped rows, success and failure (plus
//!   alerts) are reported to it.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::container::{Container, OutputFormat, write_atomic};
use crate::error::{ConversionError, ConversionResult};
use crate::version::CURRENT_VERSION;

use super::assemble::{DEFAULT_MAX_SUBJECT_SLOTS, SubjectAliases, assemble_records};
use super::delimiter::{DEFAULT_DELIMITERS, DEFAULT_SAMPLE_ROWS, detect_delimiter};
use super::observability::{
    ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats, severity_for_error,
};
use super::reader::{SkippedRow, read_table};
use super::sanitize::sanitize;

/// Source label used for in-memory input.
pub const MEMORY_SOURCE: &str = "<memory>";

/// Options controlling conversion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ConvertOptions {
    /// Candidate delimiters, in priority order.
    pub delimiters: Vec<u8>,
    /// Leading rows inspected per delimiter candidate.
    pub sample_rows: usize,
    /// Tagged container (default) or legacy bare list.
    pub format: OutputFormat,
    /// Group name for tagged containers. If `None`, the input file stem is used
    /// (empty for in-memory text).
    pub group: Option<String>,
    /// Version written to `metrika_version`.
    pub schema_version: String,
    /// Upper bound on subject slots read per row.
    pub max_subject_slots: usize,
    /// Renaming applied to subject names. Defaults to [`SubjectAliases::esfera`];
    /// [`SubjectAliases::none`] keeps names as exported.
    pub subject_aliases: SubjectAliases,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ConversionSeverity,
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("delimiters", &self.delimiters)
            .field("sample_rows", &self.sample_rows)
            .field("format", &self.format)
            .field("group", &self.group)
            .field("schema_version", &self.schema_version)
            .field("max_subject_slots", &self.max_subject_slots)
            .field("subject_aliases", &self.subject_aliases)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
            format: OutputFormat::Tagged,
            group: None,
            schema_version: CURRENT_VERSION.to_string(),
            max_subject_slots: DEFAULT_MAX_SUBJECT_SLOTS,
            subject_aliases: SubjectAliases::esfera(),
            observer: None,
            alert_at_or_above: ConversionSeverity::Critical,
        }
    }
}

/// A container built in memory, with what the pipeline saw on the way.
#[derive(Debug, Clone)]
pub struct BuiltContainer {
    pub container: Container,
    pub stats: ConversionStats,
    pub skipped: Vec<SkippedRow>,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub container: Container,
    /// The serialized container, exactly as written.
    pub json: String,
    pub stats: ConversionStats,
    pub skipped: Vec<SkippedRow>,
    /// Where the container was written, if anywhere.
    pub output: Option<PathBuf>,
}

/// Outcome of [`convert`]: never an error, always a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub success: bool,
    pub message: String,
    /// Serialized container on success.
    pub json: Option<String>,
}

/// Input accepted by [`convert`].
#[derive(Debug, Clone, Copy)]
pub enum ConversionInput<'a> {
    Path(&'a Path),
    Text(&'a str),
}

/// Run the pipeline and report `(success, message, json)`.
///
/// Missing files, undetectable delimiters, empty data, encoding problems and unwritable
/// destinations all come back as `success == false` with a descriptive message.
///
/// ```no_run
/// use std::path::Path;
///
/// use metrika_ingest::ingestion::{convert, ConversionInput, ConvertOptions};
///
/// let outcome = convert(
///     ConversionInput::Path(Path::new("T1.csv")),
///     Path::new("T1.json"),
///     "T1",
///     &ConvertOptions::default(),
/// );
/// println!("{} {}", outcome.success, outcome.message);
/// ```
pub fn convert(
    input: ConversionInput<'_>,
    output: &Path,
    term: &str,
    options: &ConvertOptions,
) -> ConversionOutcome {
    let result = match input {
        ConversionInput::Path(p) => convert_from_path(p, Some(output), term, options),
        ConversionInput::Text(t) => convert_from_str(t, Some(output), term, options),
    };

    match result {
        Ok(report) => ConversionOutcome {
            success: true,
            message: format!(
                "conversion completed: {} students written to {} ({} rows skipped)",
                report.stats.students,
                output.display(),
                report.stats.rows_skipped
            ),
            json: Some(report.json),
        },
        Err(e) => ConversionOutcome {
            success: false,
            message: format!("error: {e}"),
            json: None,
        },
    }
}

/// Convert a file on disk. When `output` is `Some`, the container is written there.
pub fn convert_from_path(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    term: &str,
    options: &ConvertOptions,
) -> ConversionResult<ConversionReport> {
    let input = input.as_ref();
    let ctx = ConversionContext {
        source: input.display().to_string(),
        output: output.map(Path::to_path_buf),
        term: term.to_string(),
    };
    let group = options
        .group
        .clone()
        .unwrap_or_else(|| file_stem(input).unwrap_or_default());

    let result = read_input_text(input)
        .and_then(|text| run_pipeline(&text, output, term, &group, options, &ctx));
    finish(&ctx, options, result)
}

/// Convert in-memory text. When `output` is `Some`, the container is written there.
pub fn convert_from_str(
    text: &str,
    output: Option<&Path>,
    term: &str,
    options: &ConvertOptions,
) -> ConversionResult<ConversionReport> {
    let ctx = ConversionContext {
        source: MEMORY_SOURCE.to_string(),
        output: output.map(Path::to_path_buf),
        term: term.to_string(),
    };
    let group = options.group.clone().unwrap_or_default();
    let result = run_pipeline(text, output, term, &group, options, &ctx);
    finish(&ctx, options, result)
}

/// The pure pipeline: text in, container out. Nothing is read or written.
///
/// If `term` is blank, the term is derived as `T{n}` from the `numero_avaluacio` column.
pub fn build_container(
    text: &str,
    term: &str,
    group: &str,
    options: &ConvertOptions,
) -> ConversionResult<BuiltContainer> {
    if text.trim().is_empty() {
        return Err(ConversionError::EmptyData {
            message: "input is empty".to_string(),
        });
    }

    let delimiter = detect_delimiter(text, &options.delimiters, options.sample_rows)?;
    let sanitized = sanitize(text, delimiter);
    let table = read_table(&sanitized, delimiter)?;
    let assembly = assemble_records(&table, options.max_subject_slots, &options.subject_aliases);

    let mut skipped = table.skipped.clone();
    skipped.extend(assembly.skipped);
    skipped.sort_by_key(|s| s.line);

    if assembly.records.is_empty() {
        return Err(ConversionError::EmptyData {
            message: format!(
                "no valid students found ({} rows read, {} skipped)",
                table.row_count(),
                skipped.len()
            ),
        });
    }

    let term = if term.trim().is_empty() {
        assembly
            .term_number
            .as_deref()
            .map(|n| format!("T{n}"))
            .unwrap_or_default()
    } else {
        term.to_string()
    };

    let stats = ConversionStats {
        rows_read: table.row_count(),
        students: assembly.records.len(),
        rows_skipped: skipped.len(),
        delimiter,
    };
    let container = Container::build(
        options.format,
        group,
        &term,
        assembly.records,
        &options.schema_version,
    );

    Ok(BuiltContainer {
        container,
        stats,
        skipped,
    })
}

/// Read an export as UTF-8 text. A leading byte-order mark is dropped.
pub fn read_input_text(path: &Path) -> ConversionResult<String> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConversionError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| ConversionError::Encoding {
        path: path.to_path_buf(),
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

/// Distinct subject names found in an export, sorted.
pub fn unique_subjects(path: impl AsRef<Path>, options: &ConvertOptions) -> ConversionResult<BTreeSet<String>> {
    let text = read_input_text(path.as_ref())?;
    let built = build_container(&text, "", "", options)?;
    Ok(built
        .container
        .students()
        .iter()
        .flat_map(|s| s.subjects.iter().map(|m| m.subject_name.clone()))
        .collect())
}

fn run_pipeline(
    text: &str,
    output: Option<&Path>,
    term: &str,
    group: &str,
    options: &ConvertOptions,
    ctx: &ConversionContext,
) -> ConversionResult<ConversionReport> {
    let built = match build_container(text, term, group, options) {
        Ok(b) => b,
        Err(e) => {
            if let (ConversionError::EmptyData { .. }, Some(out)) = (&e, output) {
                remove_stale_output(out);
            }
            return Err(e);
        }
    };

    if let Some(obs) = options.observer.as_ref() {
        for row in &built.skipped {
            obs.on_row_skipped(ctx, row);
        }
    }

    let json = built.container.to_json_string()?;
    if let Some(out) = output {
        write_atomic(out, &json)?;
    }

    Ok(ConversionReport {
        container: built.container,
        json,
        stats: built.stats,
        skipped: built.skipped,
        output: output.map(Path::to_path_buf),
    })
}

fn finish(
    ctx: &ConversionContext,
    options: &ConvertOptions,
    result: ConversionResult<ConversionReport>,
) -> ConversionResult<ConversionReport> {
    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(report) => obs.on_success(ctx, report.stats),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
    result
}

// An empty conversion must not leave an earlier container behind at the destination.
fn remove_stale_output(path: &Path) {
    if path.is_file() {
        let _ = fs::remove_file(path);
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Convenience helper for callers that want an owned request object.
///
/// This can be useful if you want to queue conversions in a job system.
#[derive(Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub term: String,
    pub options: ConvertOptions,
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("term", &self.term)
            .field("options", &self.options)
            .finish()
    }
}

impl ConversionRequest {
    /// Execute the request by calling [`convert_from_path`].
    pub fn run(&self) -> ConversionResult<ConversionReport> {
        convert_from_path(&self.input, Some(&self.output), &self.term, &self.options)
    }
}
