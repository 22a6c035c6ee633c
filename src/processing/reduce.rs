//! Mark statistics over student records.
//!
//! Marks are classified against the closed [`Qualification`] set; anything else is counted
//! as unclassified rather than rejected.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Qualification, StudentRecord};

/// Tally of marks by qualification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkCounts {
    pub no_assoliment: usize,
    pub satisfactori: usize,
    pub notable: usize,
    pub excellent: usize,
    /// Empty or unrecognized marks.
    pub unclassified: usize,
}

impl MarkCounts {
    /// Count one mark label.
    pub fn record(&mut self, mark: &str) {
        match Qualification::from_label(mark) {
            Some(Qualification::NoAssoliment) => self.no_assoliment += 1,
            Some(Qualification::Satisfactori) => self.satisfactori += 1,
            Some(Qualification::Notable) => self.notable += 1,
            Some(Qualification::Excellent) => self.excellent += 1,
            None => self.unclassified += 1,
        }
    }

    pub fn get(&self, q: Qualification) -> usize {
        match q {
            Qualification::NoAssoliment => self.no_assoliment,
            Qualification::Satisfactori => self.satisfactori,
            Qualification::Notable => self.notable,
            Qualification::Excellent => self.excellent,
        }
    }

    /// Classified marks only.
    pub fn classified(&self) -> usize {
        self.no_assoliment + self.satisfactori + self.notable + self.excellent
    }

    pub fn total(&self) -> usize {
        self.classified() + self.unclassified
    }

    /// Mean qualification weight over classified marks (`None` if there are none).
    pub fn mean_weight(&self) -> Option<f64> {
        let n = self.classified();
        if n == 0 {
            return None;
        }
        let sum: usize = Qualification::ALL
            .into_iter()
            .map(|q| self.get(q) * usize::from(q.weight()))
            .sum();
        Some(sum as f64 / n as f64)
    }
}

/// Count every subject mark across `students`.
pub fn mark_counts(students: &[StudentRecord]) -> MarkCounts {
    students
        .iter()
        .flat_map(|s| s.subjects.iter())
        .fold(MarkCounts::default(), |mut acc, subject| {
            acc.record(&subject.mark);
            acc
        })
}

/// Mark counts keyed by subject name.
pub fn mark_counts_by_subject(students: &[StudentRecord]) -> BTreeMap<String, MarkCounts> {
    let mut out: BTreeMap<String, MarkCounts> = BTreeMap::new();
    for subject in students.iter().flat_map(|s| s.subjects.iter()) {
        out.entry(subject.subject_name.clone())
            .or_default()
            .record(&subject.mark);
    }
    out
}

/// Distinct subject names, sorted.
pub fn unique_subjects_of(students: &[StudentRecord]) -> BTreeSet<String> {
    students
        .iter()
        .flat_map(|s| s.subjects.iter().map(|m| m.subject_name.clone()))
        .collect()
}

/// Students with at least one `No assoliment`, as `(id, count)`, in input order.
pub fn failing_students(students: &[StudentRecord]) -> Vec<(String, usize)> {
    students
        .iter()
        .filter_map(|s| {
            let failed = s
                .subjects
                .iter()
                .filter(|m| m.qualification() == Some(Qualification::NoAssoliment))
                .count();
            (failed > 0).then(|| (s.id.clone(), failed))
        })
        .collect()
}
