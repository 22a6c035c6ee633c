//! Tabular reader: delimited text into header-keyed rows.
//!
//! Rows are kept as generic name → value mappings because the export has no fixed schema;
//! subject columns are open-ended (`m1`, `q1`, `c1`, `m2`, ...).

use std::collections::HashMap;

use crate::error::{ConversionError, ConversionResult};

/// One data row, keyed by normalized (trimmed, lowercase) header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line of the record in the source text (the header is line 1).
    pub line: usize,
    fields: HashMap<String, String>,
}

impl Row {
    pub fn new(line: usize, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&normalize_header(name)).map(String::as_str)
    }

    /// First present value among `names`.
    pub fn get_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| self.get(n))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A row that was dropped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Parsed table: header names in source order plus data rows.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows dropped for having the wrong field count or failing to parse.
    pub skipped: Vec<SkippedRow>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Read sanitized text with `delimiter`.
///
/// Rules:
///
/// - Row 1 is the header.
/// - Every cell is trimmed.
/// - Rows whose field count differs from the header's are skipped, as are rows the CSV
///   parser rejects. Blank lines are ignored.
/// - Duplicate header names keep the first column.
///
/// Returns [`ConversionError::EmptyData`] when no data rows remain.
pub fn read_table(text: &str, delimiter: u8) -> ConversionResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ConversionError::Format {
            message: format!("unreadable header row: {e}"),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ConversionError::EmptyData {
            message: "input has no header row".to_string(),
        });
    }

    let keys: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut table = RawTable {
        headers,
        ..Default::default()
    };

    for (idx0, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx0 + 2);
                table.skipped.push(SkippedRow {
                    line,
                    reason: format!("unparsable record: {e}"),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx0 + 2);

        if record.len() != keys.len() {
            table.skipped.push(SkippedRow {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    keys.len(),
                    record.len()
                ),
            });
            continue;
        }

        let mut fields = HashMap::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(record.iter()) {
            fields
                .entry(key.clone())
                .or_insert_with(|| value.to_string());
        }
        table.rows.push(Row::new(line, fields));
    }

    if table.rows.is_empty() {
        return Err(ConversionError::EmptyData {
            message: format!(
                "no usable data rows ({} skipped)",
                table.skipped.len()
            ),
        });
    }

    Ok(table)
}

pub(crate) fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_keyed_by_header() {
        let table = read_table("id|Nom_Cognoms\n 1 | Anna \n2|Pau\n", b'|').unwrap();
        assert_eq!(table.headers, vec!["id", "Nom_Cognoms"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].get("nom_cognoms"), Some("Anna"));
        assert_eq!(table.rows[0].get("NOM_COGNOMS"), Some("Anna"));
        assert_eq!(table.rows[0].get("id"), Some("1"));
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn wrong_field_counts_are_skipped_not_fatal() {
        let table = read_table("id|nom\n1|Anna\n2|Pau|extra\n3\n4|Marta\n", b'|').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.skipped.len(), 2);
        assert_eq!(table.skipped[0].line, 3);
        assert!(table.skipped[0].reason.contains("expected 2 fields, found 3"));
    }

    #[test]
    fn header_only_is_empty_data() {
        let err = read_table("id|nom\n", b'|').unwrap_err();
        assert!(matches!(err, ConversionError::EmptyData { .. }));
    }

    #[test]
    fn empty_text_is_empty_data() {
        let err = read_table("", b'|').unwrap_err();
        assert!(matches!(err, ConversionError::EmptyData { .. }));
    }

    #[test]
    fn duplicate_headers_keep_first_column() {
        let table = read_table("id|x|X\n1|first|second\n", b'|').unwrap();
        assert_eq!(table.rows[0].get("x"), Some("first"));
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn get_any_returns_first_present_alias() {
        let table = read_table("ID|full_name\n7|Núria\n", b'|').unwrap();
        let row = &table.rows[0];
        assert_eq!(row.get_any(&["nom_cognoms", "full_name"]), Some("Núria"));
        assert_eq!(row.get_any(&["missing"]), None);
    }
}
