//! `metrika-ingest` turns school report-card exports (delimited text, one row per student) into
//! versioned JSON containers, and loads those containers back into one merged view for
//! dashboards.
//!
//! The primary entrypoint is [`ingestion::convert`], which never returns an error: every expected
//! failure (missing input, undetectable delimiter, empty data, bad encoding, unwritable output)
//! comes back as a `success == false` outcome with a message. Use
//! [`ingestion::convert_from_path`] for typed [`ConversionError`]s.
//!
//! ## What the conversion does
//!
//! - Line breaks inside quoted cells are replaced by a single space
//! - The delimiter is detected from a priority list (pipe, semicolon, tab, comma by default)
//! - Each row becomes a [`types::StudentRecord`]; subjects are read from the numbered slots
//!   `m1/q1/c1`, `m2/q2/c2`, ... until the first empty subject name
//! - Rows without an id or a full name are skipped and reported, never fatal
//! - The container is written atomically (temporary file, then rename)
//!
//! ## Quick example: convert an export
//!
//! ```no_run
//! use std::path::Path;
//!
//! use metrika_ingest::ingestion::{convert_from_path, ConvertOptions};
//!
//! # fn main() -> Result<(), metrika_ingest::ConversionError> {
//! let report = convert_from_path(
//!     "3B_T1.csv",
//!     Some(Path::new("3B_T1.json")),
//!     "Primer trimestre",
//!     &ConvertOptions::default(),
//! )?;
//! println!("students={} skipped={}", report.stats.students, report.stats.rows_skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Loading containers
//!
//! ```no_run
//! use metrika_ingest::loader::load_directory;
//! use metrika_ingest::version::VersionPolicy;
//!
//! # fn main() -> Result<(), metrika_ingest::ConversionError> {
//! let data = load_directory("data", &VersionPolicy::default())?;
//! for w in &data.version_warnings {
//!     eprintln!("{w}");
//! }
//! println!("students={} files={}", data.students.len(), data.file_info.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: conversion entrypoints and the individual pipeline stages
//! - [`container`]: the persisted JSON format (tagged or legacy)
//! - [`loader`]: merging containers from disk or uploads
//! - [`version`]: version comparison and compatibility warnings
//! - [`processing`]: filters and mark statistics over loaded students
//! - [`execution`]: batch conversion on a thread pool
//! - [`config`]: JSON pipeline configuration
//! - [`types`]: student records and marks
//! - [`error`]: error types

pub mod config;
pub mod container;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod loader;
pub mod processing;
pub mod types;
pub mod version;

pub use container::{Container, OutputFormat};
pub use error::{ConversionError, ConversionResult};
pub use types::{Qualification, StudentRecord, SubjectEntry};
pub use version::{CURRENT_VERSION, MIN_COMPATIBLE_VERSION};
