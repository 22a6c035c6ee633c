//! Record filtering for merged student lists.

use crate::types::StudentRecord;

/// Returns the students for which `predicate` returns `true`, in their original order.
pub fn filter_students<F>(students: &[StudentRecord], mut predicate: F) -> Vec<StudentRecord>
where
    F: FnMut(&StudentRecord) -> bool,
{
    students
        .iter()
        .filter(|s| predicate(s))
        .cloned()
        .collect()
}

/// Students tagged with `term`.
pub fn by_term(students: &[StudentRecord], term: &str) -> Vec<StudentRecord> {
    filter_students(students, |s| s.term.as_deref() == Some(term))
}

/// Students loaded from the container whose display name is `display_name`.
pub fn by_display_name(students: &[StudentRecord], display_name: &str) -> Vec<StudentRecord> {
    filter_students(students, |s| s.source_display_name.as_deref() == Some(display_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_students() -> Vec<StudentRecord> {
        let mut a = StudentRecord::new("1", "Anna");
        a.term = Some("T1".to_string());
        a.source_display_name = Some("3B_T1".to_string());
        let mut b = StudentRecord::new("2", "Pau");
        b.term = Some("T2".to_string());
        b.source_display_name = Some("3B_T2".to_string());
        let mut c = StudentRecord::new("3", "Marta");
        c.term = Some("T1".to_string());
        c.source_display_name = Some("Grup_Antic_T1".to_string());
        vec![a, b, c]
    }

    #[test]
    fn by_term_keeps_order() {
        let out = by_term(&sample_students(), "T1");
        let ids: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn by_display_name_selects_one_container() {
        let out = by_display_name(&sample_students(), "Grup_Antic_T1");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].full_name, "Marta");
    }

    #[test]
    fn filter_can_return_empty() {
        let students = sample_students();
        assert!(filter_students(&students, |_| false).is_empty());
        assert_eq!(students.len(), 3);
    }
}
