//! Conversion entrypoints and pipeline stages.
//!
//! Most callers should use [`convert()`] (from [`convert`](mod@convert)) which:
//!
//! - detects the delimiter from a priority list
//! - sanitizes line breaks inside quoted cells
//! - reads header-keyed rows and assembles one student record per valid row
//! - builds a tagged (or legacy) container and writes it atomically
//! - optionally reports skipped rows, success, failure and alerts to a [`ConversionObserver`]
//!
//! The individual stages are available under:
//! - [`delimiter`]
//! - [`sanitize`](mod@sanitize)
//! - [`reader`]
//! - [`assemble`]

pub mod assemble;
pub mod convert;
pub mod delimiter;
pub mod observability;
pub mod reader;
pub mod sanitize;

pub use assemble::SubjectAliases;
pub use convert::{
    BuiltContainer, ConversionInput, ConversionOutcome, ConversionReport, ConversionRequest, ConvertOptions,
    build_container, convert, convert_from_path, convert_from_str, unique_subjects,
};
pub use observability::{
    CompositeObserver, ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats, FileObserver,
    StdErrObserver, TracingObserver,
};
pub use reader::{RawTable, Row, SkippedRow};
