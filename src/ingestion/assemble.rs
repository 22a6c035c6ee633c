//! Record assembly: table rows into [`StudentRecord`]s.
//!
//! Subjects live in open-ended indexed slots. Slot `i` is the triplet
//! `m{i}`/`q{i}`/`c{i}` (name, mark, comment); `subject_{i}`/`mark_{i}`/`comment_{i}` are
//! accepted as well. Discovery stops at the first slot whose name is absent or empty.

use std::collections::BTreeMap;

use super::reader::{RawTable, Row, SkippedRow};
use crate::types::{StudentRecord, SubjectEntry};

pub const ID_ALIASES: &[&str] = &["id", "student_id"];
pub const FULL_NAME_ALIASES: &[&str] = &["nom_cognoms", "full_name"];
pub const TERM_NUMBER_ALIASES: &[&str] = &["numero_avaluacio", "term_number"];
pub const GENERAL_COMMENT_ALIASES: &[&str] =
    &["comentari general", "comentari_general", "general_comment"];

/// Upper bound on subject slots read per row.
pub const DEFAULT_MAX_SUBJECT_SLOTS: usize = 100;

/// Renaming of exported subject labels (e.g. `Ll. Cat.` → `CAT`).
///
/// Names without an entry pass through unchanged. [`SubjectAliases::default`] is the empty
/// table; conversions use [`SubjectAliases::esfera`] unless told otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAliases(BTreeMap<String, String>);

impl SubjectAliases {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    /// No renaming.
    pub fn none() -> Self {
        Self::default()
    }

    /// Column labels used by the Esfera administrative system, mapped to short names.
    pub fn esfera() -> Self {
        let pairs = [
            ("Ll. Cat.", "CAT"),
            ("Ll. Cast.", "CAST"),
            ("Ll. Estr.", "ANG"),
            ("Mat.", "MAT"),
            ("BG", "BG"),
            ("FQ", "FQ"),
            ("TD", "TD"),
            ("CS:GH", "CS"),
            ("Mús.", "MUS"),
            ("Ed. Fís.", "EDF"),
            ("Optativa", "OPT"),
            ("PG_I", "PG_I"),
            ("PG_II", "PG_II"),
            ("Comp. Dig.", "COMP_DIG"),
            ("Comp. Pers.", "COMP_PERS"),
            ("Comp. Ciut.", "COMP_CIUT"),
            ("Comp. Empr.", "COMP_EMPR"),
        ];
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Result of assembling a table.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub records: Vec<StudentRecord>,
    /// Rows dropped for missing required fields.
    pub skipped: Vec<SkippedRow>,
    /// Term number (`numero_avaluacio`) of the first accepted row that has one.
    pub term_number: Option<String>,
}

/// Build one record per row; rows missing an id or full name are dropped.
pub fn assemble_records(table: &RawTable, max_slots: usize, aliases: &SubjectAliases) -> Assembly {
    let mut out = Assembly::default();

    for row in &table.rows {
        match assemble_row(row, max_slots, aliases) {
            Ok(record) => {
                if out.term_number.is_none() {
                    out.term_number = non_empty(row.get_any(TERM_NUMBER_ALIASES)).map(str::to_string);
                }
                out.records.push(record);
            }
            Err(reason) => out.skipped.push(SkippedRow {
                line: row.line,
                reason,
            }),
        }
    }

    out
}

/// Assemble a single row, or explain why it was rejected.
pub fn assemble_row(row: &Row, max_slots: usize, aliases: &SubjectAliases) -> Result<StudentRecord, String> {
    let id = non_empty(row.get_any(ID_ALIASES)).ok_or("missing id")?;
    let full_name = non_empty(row.get_any(FULL_NAME_ALIASES)).ok_or("missing full name")?;

    let mut record = StudentRecord::new(id, full_name);
    record.general_comment = row
        .get_any(GENERAL_COMMENT_ALIASES)
        .unwrap_or_default()
        .to_string();
    record.subjects = discover_subjects(row, max_slots, aliases);
    Ok(record)
}

/// Walk subject slots from 1 until the first absent or empty name.
pub fn discover_subjects(row: &Row, max_slots: usize, aliases: &SubjectAliases) -> Vec<SubjectEntry> {
    let mut subjects = Vec::new();
    for i in 1..=max_slots {
        let name_keys = [format!("m{i}"), format!("subject_{i}")];
        let Some(name) = non_empty(lookup(row, &name_keys)) else {
            break;
        };
        let mark = lookup(row, &[format!("q{i}"), format!("mark_{i}")]).unwrap_or_default();
        let comment = lookup(row, &[format!("c{i}"), format!("comment_{i}")]).unwrap_or_default();
        subjects.push(SubjectEntry::new(aliases.resolve(name), mark, comment));
    }
    subjects
}

fn lookup<'a>(row: &'a Row, keys: &[String]) -> Option<&'a str> {
    keys.iter().find_map(|k| row.get(k))
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}
