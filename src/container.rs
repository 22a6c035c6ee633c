//! Persisted container format.
//!
//! A container is either the tagged object
//!
//! ```json
//! {"grup": "3B", "trimestre": "T1", "estudiants": [...], "metrika_version": "1.0.0"}
//! ```
//!
//! or, for legacy files, a bare array of students. [`Container::from_json_str`] is the single
//! place that decides which shape a document has.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ConversionResult};
use crate::types::StudentRecord;
use crate::version::LEGACY_VERSION;

/// Output shape requested from the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Tagged object with group/term metadata and a schema version.
    #[default]
    Tagged,
    /// Bare array of students (legacy consumers).
    Legacy,
}

/// Tagged container payload. Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedContainer {
    #[serde(rename = "grup", default)]
    pub group: String,
    #[serde(rename = "trimestre", default)]
    pub term: String,
    #[serde(rename = "estudiants", default)]
    pub students: Vec<StudentRecord>,
    #[serde(rename = "metrika_version", default = "legacy_version")]
    pub schema_version: String,
}

fn legacy_version() -> String {
    LEGACY_VERSION.to_string()
}

/// One term's worth of student records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Container {
    Tagged(TaggedContainer),
    Bare(Vec<StudentRecord>),
}

impl Container {
    /// Wrap records with metadata.
    pub fn tagged(
        group: impl Into<String>,
        term: impl Into<String>,
        students: Vec<StudentRecord>,
        schema_version: impl Into<String>,
    ) -> Self {
        Self::Tagged(TaggedContainer {
            group: group.into(),
            term: term.into(),
            students,
            schema_version: schema_version.into(),
        })
    }

    /// Legacy bare list; every record carries `term`.
    pub fn bare(mut students: Vec<StudentRecord>, term: &str) -> Self {
        for s in &mut students {
            s.term = Some(term.to_string());
        }
        Self::Bare(students)
    }

    /// Build the container shape requested by `format`.
    pub fn build(
        format: OutputFormat,
        group: &str,
        term: &str,
        students: Vec<StudentRecord>,
        schema_version: &str,
    ) -> Self {
        match format {
            OutputFormat::Tagged => Self::tagged(group, term, students, schema_version),
            OutputFormat::Legacy => Self::bare(students, term),
        }
    }

    pub fn students(&self) -> &[StudentRecord] {
        match self {
            Self::Tagged(c) => &c.students,
            Self::Bare(s) => s,
        }
    }

    pub fn into_students(self) -> Vec<StudentRecord> {
        match self {
            Self::Tagged(c) => c.students,
            Self::Bare(s) => s,
        }
    }

    /// Declared schema version (`0.0.0` for bare lists).
    pub fn schema_version(&self) -> &str {
        match self {
            Self::Tagged(c) => &c.schema_version,
            Self::Bare(_) => LEGACY_VERSION,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Bare(_))
    }

    /// Parse a container, dispatching on the top-level JSON shape.
    pub fn from_json_str(text: &str) -> ConversionResult<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(value)
    }

    /// Parse a container from raw bytes (must be UTF-8).
    pub fn from_json_slice(bytes: &[u8]) -> ConversionResult<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: serde_json::Value) -> ConversionResult<Self> {
        let tagged = matches!(&value, serde_json::Value::Object(map) if map.contains_key("estudiants"));
        if tagged {
            return Ok(Self::Tagged(serde_json::from_value(value)?));
        }
        match value {
            serde_json::Value::Array(_) => Ok(Self::Bare(serde_json::from_value(value)?)),
            serde_json::Value::Object(_) => Err(ConversionError::Container {
                message: "object has no 'estudiants' key".to_string(),
            }),
            other => Err(ConversionError::Container {
                message: format!("expected an object or an array, found {}", json_kind(&other)),
            }),
        }
    }

    /// Pretty-printed UTF-8 JSON (non-ASCII characters are written as-is).
    pub fn to_json_string(&self) -> ConversionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a container file.
    pub fn read_from_path(path: impl AsRef<Path>) -> ConversionResult<Self> {
        let bytes = fs::read(path)?;
        Self::from_json_slice(&bytes)
    }
}

/// Write `contents` to `path` through a temporary file in the same directory.
///
/// The destination only appears once the whole document is on disk; on failure the
/// temporary file is removed and `path` is left untouched.
pub fn write_atomic(path: &Path, contents: &str) -> ConversionResult<()> {
    let out_err = |source: std::io::Error| ConversionError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    if path.is_dir() {
        return Err(out_err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "destination is a directory",
        )));
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(out_err)?;
    tmp.write_all(contents.as_bytes()).map_err(out_err)?;
    tmp.flush().map_err(out_err)?;
    tmp.persist(path).map_err(|e| out_err(e.error))?;
    Ok(())
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
