//! Core record types shared by the conversion pipeline and the loader.
//!
//! Field names follow the persisted JSON contract (Catalan keys such as `nom_cognoms` and
//! `materies`); the Rust names describe what each field holds.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One subject's evaluation for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntry {
    /// Subject name as exported (or as mapped by a subject alias table).
    #[serde(rename = "materia", default, deserialize_with = "nullable_string")]
    pub subject_name: String,
    /// Qualification label, passed through verbatim.
    #[serde(rename = "qualificacio", default, deserialize_with = "nullable_string")]
    pub mark: String,
    /// Free-text teacher comment.
    #[serde(rename = "comentari", default, deserialize_with = "nullable_string")]
    pub comment: String,
}

impl SubjectEntry {
    /// Create a subject entry.
    pub fn new(
        subject_name: impl Into<String>,
        mark: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            mark: mark.into(),
            comment: comment.into(),
        }
    }

    /// Classify the mark against the closed qualification set.
    pub fn qualification(&self) -> Option<Qualification> {
        Qualification::from_label(&self.mark)
    }
}

/// A normalized student report card for one term.
///
/// `term`, `group` and `source_display_name` are provenance fields: they are omitted from
/// the JSON when absent and are filled in by the loader when containers are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(default, deserialize_with = "nullable_string")]
    pub id: String,
    #[serde(rename = "nom_cognoms", default, deserialize_with = "nullable_string")]
    pub full_name: String,
    /// Subjects in the order their slots appeared in the export.
    #[serde(rename = "materies", default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(rename = "comentari_general", default, deserialize_with = "nullable_string")]
    pub general_comment: String,
    #[serde(rename = "trimestre", default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(rename = "grup", default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(rename = "file_display_name", default, skip_serializing_if = "Option::is_none")]
    pub source_display_name: Option<String>,
}

impl StudentRecord {
    /// Create a record with no subjects and no provenance.
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            subjects: Vec::new(),
            general_comment: String::new(),
            term: None,
            group: None,
            source_display_name: None,
        }
    }

    /// True when the id is empty or the administrative `NULL` sentinel.
    pub fn has_sentinel_id(&self) -> bool {
        is_sentinel_id(&self.id)
    }
}

/// Returns true for ids the source system uses to mark non-student rows.
pub fn is_sentinel_id(id: &str) -> bool {
    let id = id.trim();
    id.is_empty() || id.eq_ignore_ascii_case("NULL")
}

/// The four ordinal evaluation labels of the source grading system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualification {
    NoAssoliment,
    Satisfactori,
    Notable,
    Excellent,
}

impl Qualification {
    /// All qualifications in ascending order.
    pub const ALL: [Qualification; 4] = [
        Qualification::NoAssoliment,
        Qualification::Satisfactori,
        Qualification::Notable,
        Qualification::Excellent,
    ];

    /// Classify a mark label. Accepts the full label or its short code (`NA`, `AS`, `AN`, `AE`).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|q| q.label() == label || q.short_code() == label)
    }

    /// Full label as it appears in exports.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoAssoliment => "No assoliment",
            Self::Satisfactori => "Assoliment satisfactori",
            Self::Notable => "Assoliment notable",
            Self::Excellent => "Assoliment excel·lent",
        }
    }

    pub fn short_code(self) -> &'static str {
        match self {
            Self::NoAssoliment => "NA",
            Self::Satisfactori => "AS",
            Self::Notable => "AN",
            Self::Excellent => "AE",
        }
    }

    /// Ordinal weight used by statistics (1 = lowest).
    pub fn weight(self) -> u8 {
        match self {
            Self::NoAssoliment => 1,
            Self::Satisfactori => 2,
            Self::Notable => 3,
            Self::Excellent => 4,
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts a JSON string, number, bool or `null` (mapped to an empty string).
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, found {other}"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_ids_are_case_insensitive() {
        assert!(is_sentinel_id("NULL"));
        assert!(is_sentinel_id("null"));
        assert!(is_sentinel_id(" Null "));
        assert!(is_sentinel_id(""));
        assert!(!is_sentinel_id("12345"));
        assert!(!is_sentinel_id("NULLA"));
    }

    #[test]
    fn qualification_classifies_labels_and_codes() {
        assert_eq!(
            Qualification::from_label("Assoliment excel·lent"),
            Some(Qualification::Excellent)
        );
        assert_eq!(Qualification::from_label(" NA "), Some(Qualification::NoAssoliment));
        assert_eq!(Qualification::from_label("Invalid Grade"), None);
        assert_eq!(Qualification::from_label(""), None);
        assert!(Qualification::NoAssoliment < Qualification::Excellent);
        assert_eq!(Qualification::Notable.weight(), 3);
    }

    #[test]
    fn null_and_numeric_ids_deserialize_to_strings() {
        let r: StudentRecord =
            serde_json::from_str(r#"{"id": null, "nom_cognoms": "Invalid None", "materies": []}"#)
                .unwrap();
        assert_eq!(r.id, "");
        assert!(r.has_sentinel_id());

        let r: StudentRecord = serde_json::from_str(r#"{"id": 12345, "nom_cognoms": "X"}"#).unwrap();
        assert_eq!(r.id, "12345");
        assert!(r.subjects.is_empty());
        assert_eq!(r.general_comment, "");
    }

    #[test]
    fn provenance_fields_are_omitted_when_absent() {
        let r = StudentRecord::new("1", "Anna");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","nom_cognoms":"Anna","materies":[],"comentari_general":""}"#
        );
    }
}
