//! JSON-loadable pipeline configuration.
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```
//! use metrika_ingest::config::PipelineConfig;
//!
//! let cfg = PipelineConfig::from_json_str(r#"{"delimiters": ["|", ";"], "group": "3B"}"#).unwrap();
//! let opts = cfg.to_convert_options().unwrap();
//! assert_eq!(opts.delimiters, vec![b'|', b';']);
//! assert_eq!(opts.group.as_deref(), Some("3B"));
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::container::OutputFormat;
use crate::error::{ConversionError, ConversionResult};
use crate::ingestion::ConvertOptions;
use crate::ingestion::SubjectAliases;
use crate::ingestion::assemble::DEFAULT_MAX_SUBJECT_SLOTS;
use crate::version::{CURRENT_VERSION, MIN_COMPATIBLE_VERSION, VersionPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Version stamped on new containers and the upper bound of the loader's window.
    pub current_version: String,
    pub min_compatible_version: String,
    /// Candidate delimiters in priority order, as single characters or names
    /// (`pipe`, `semicolon`, `tab`, `comma`).
    pub delimiters: Vec<String>,
    /// Write bare arrays instead of tagged containers.
    pub legacy_output: bool,
    pub max_subject_slots: usize,
    pub group: Option<String>,
    /// Shorten the administrative system's subject labels (`Mat.` → `MAT`, ...).
    /// On unless set to `false`.
    pub esfera_subject_aliases: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            current_version: CURRENT_VERSION.to_string(),
            min_compatible_version: MIN_COMPATIBLE_VERSION.to_string(),
            delimiters: ["|", ";", "\t", ","].iter().map(|s| s.to_string()).collect(),
            legacy_output: false,
            max_subject_slots: DEFAULT_MAX_SUBJECT_SLOTS,
            group: None,
            esfera_subject_aliases: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> ConversionResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> ConversionResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConversionError::MissingFile {
                path: path.to_path_buf(),
            },
            _ => ConversionError::Io(e),
        })?;
        Self::from_json_str(&text)
    }

    /// Options for [`crate::ingestion::convert`]. No observer is attached.
    pub fn to_convert_options(&self) -> ConversionResult<ConvertOptions> {
        let delimiters = self
            .delimiters
            .iter()
            .map(|d| parse_delimiter(d))
            .collect::<ConversionResult<Vec<u8>>>()?;
        if delimiters.is_empty() {
            return Err(ConversionError::Format {
                message: "configuration lists no delimiters".to_string(),
            });
        }
        if self.max_subject_slots == 0 {
            return Err(ConversionError::Format {
                message: "max_subject_slots must be > 0".to_string(),
            });
        }

        Ok(ConvertOptions {
            delimiters,
            format: if self.legacy_output {
                OutputFormat::Legacy
            } else {
                OutputFormat::Tagged
            },
            group: self.group.clone(),
            schema_version: self.current_version.clone(),
            max_subject_slots: self.max_subject_slots,
            subject_aliases: if self.esfera_subject_aliases {
                SubjectAliases::esfera()
            } else {
                SubjectAliases::none()
            },
            ..ConvertOptions::default()
        })
    }

    pub fn version_policy(&self) -> VersionPolicy {
        VersionPolicy::new(&self.current_version, &self.min_compatible_version)
    }
}

fn parse_delimiter(s: &str) -> ConversionResult<u8> {
    match s.to_ascii_lowercase().as_str() {
        "pipe" => return Ok(b'|'),
        "semicolon" => return Ok(b';'),
        "tab" | "\\t" => return Ok(b'\t'),
        "comma" => return Ok(b','),
        _ => {}
    }
    match s.as_bytes() {
        [b] if b.is_ascii() && !matches!(b, b'"' | b'\r' | b'\n') => Ok(*b),
        _ => Err(ConversionError::Format {
            message: format!("invalid delimiter '{s}' (expected a single ASCII character)"),
        }),
    }
}
