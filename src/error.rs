use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Error type returned by conversion and container parsing functions.
///
/// Row-level problems are never errors; they surface as
/// [`crate::ingestion::reader::SkippedRow`] values instead.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The input path does not exist.
    #[error("input file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },

    /// No candidate delimiter produced a multi-column parse, or the header is unreadable.
    #[error("format error: {message}")]
    Format { message: String },

    /// The input parsed but yielded no usable rows.
    #[error("no data: {message}")]
    EmptyData { message: String },

    /// The input bytes are not valid UTF-8.
    #[error("encoding error in {}: invalid utf-8 after byte {valid_up_to}", path.display())]
    Encoding { path: PathBuf, valid_up_to: usize },

    /// The destination could not be written. Nothing is left at `path`.
    #[error("failed to write output {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parsed but its top-level shape is not a known container.
    #[error("unrecognized container: {message}")]
    Container { message: String },

    /// Batch execution could not be set up.
    #[error("batch error: {message}")]
    Batch { message: String },
}
