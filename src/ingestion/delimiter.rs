//! Delimiter detection.

use crate::error::{ConversionError, ConversionResult};

/// Default candidates, in priority order.
///
/// Pipe comes first because it is the export's native delimiter and free-text comments
/// routinely contain commas.
pub const DEFAULT_DELIMITERS: [u8; 4] = [b'|', b';', b'\t', b','];

/// Default number of leading rows inspected per candidate.
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Pick the first candidate that parses at least one of the first `sample_rows` rows into
/// more than one column.
///
/// Parsing is quote-aware, so delimiters inside quoted cells do not count.
pub fn detect_delimiter(text: &str, candidates: &[u8], sample_rows: usize) -> ConversionResult<u8> {
    let sample_rows = sample_rows.max(1);
    candidates
        .iter()
        .copied()
        .find(|&d| splits_into_columns(text, d, sample_rows))
        .ok_or_else(|| ConversionError::Format {
            message: format!(
                "no usable delimiter found (tried {})",
                candidates
                    .iter()
                    .map(|&d| describe(d))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

fn splits_into_columns(text: &str, delimiter: u8, sample_rows: usize) -> bool {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    rdr.records()
        .take(sample_rows)
        .filter_map(Result::ok)
        .any(|record| record.len() > 1)
}

/// Human-readable name of a delimiter byte.
pub fn describe(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "tab".to_string(),
        b'|' => "pipe".to_string(),
        b',' => "comma".to_string(),
        b';' => "semicolon".to_string(),
        other => format!("{:?}", other as char),
    }
}
