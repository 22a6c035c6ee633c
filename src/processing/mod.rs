//! In-memory processing of merged student records.
//!
//! The processing layer operates on the student lists produced by [`crate::loader`]. It is
//! purely in-memory and never mutates its input.
//!
//! Currently implemented:
//!
//! - [`filter_students()`]: filtering by predicate, plus [`by_term`] and [`by_display_name`]
//! - [`mark_counts()`] / [`mark_counts_by_subject()`]: qualification tallies
//! - [`failing_students()`]: students with at least one `No assoliment`
//!
//! ## Example: filter → count
//!
//! ```rust
//! use metrika_ingest::processing::{by_term, mark_counts};
//! use metrika_ingest::types::{StudentRecord, SubjectEntry};
//!
//! let mut anna = StudentRecord::new("1", "Anna");
//! anna.term = Some("T1".to_string());
//! anna.subjects = vec![SubjectEntry::new("Mat", "Assoliment notable", "")];
//!
//! let mut pau = StudentRecord::new("2", "Pau");
//! pau.term = Some("T2".to_string());
//! pau.subjects = vec![SubjectEntry::new("Mat", "No assoliment", "")];
//!
//! let t1 = by_term(&[anna, pau], "T1");
//! let counts = mark_counts(&t1);
//! assert_eq!(counts.notable, 1);
//! assert_eq!(counts.no_assoliment, 0);
//! ```

pub mod filter;
pub mod reduce;

pub use filter::{by_display_name, by_term, filter_students};
pub use reduce::{MarkCounts, failing_students, mark_counts, mark_counts_by_subject, unique_subjects_of};
