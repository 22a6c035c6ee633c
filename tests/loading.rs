use std::fs;
use std::path::Path;

use metrika_ingest::ingestion::{ConvertOptions, convert_from_path};
use metrika_ingest::loader::{
    UploadedFile, discover_containers, load_container_files, load_directory, load_uploaded_files,
};
use metrika_ingest::processing::{by_display_name, mark_counts};
use metrika_ingest::version::{VersionPolicy, WarningKind};
use metrika_ingest::ConversionError;

fn copy_fixture(dir: &Path, fixture: &str, name: &str) {
    fs::copy(Path::new("tests/fixtures").join(fixture), dir.join(name)).unwrap();
}

fn tagged_with_version(version: &str) -> String {
    format!(
        r#"{{"grup":"3B","trimestre":"T1","estudiants":[{{"id":"1","nom_cognoms":"Anna","materies":[]}}],"metrika_version":"{version}"}}"#
    )
}

#[test]
fn tagged_container_is_loaded_with_provenance() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixture(dir.path(), "tagged_3b.json", "test_new.json");

    let data = load_container_files(dir.path(), &["test_new.json"], &VersionPolicy::default());
    assert_eq!(data.students.len(), 1);

    let s = &data.students[0];
    assert_eq!(s.id, "12345");
    assert_eq!(s.full_name, "Joan Pérez García");
    assert_eq!(s.group.as_deref(), Some("3B"));
    assert_eq!(s.term.as_deref(), Some("Primer trimestre"));
    assert_eq!(s.source_display_name.as_deref(), Some("3B_Primer trimestre"));
    assert_eq!(s.subjects.len(), 1);

    let info = &data.file_info["test_new.json"];
    assert_eq!(info.display_name, "3B_Primer trimestre");
    assert_eq!(info.group, "3B");
    assert_eq!(info.term, "Primer trimestre");
    assert_eq!(info.version, "1.0.0");
    assert!(data.version_warnings.is_empty());
    assert!(data.failures.is_empty());
}

#[test]
fn legacy_container_gets_synthetic_group_and_one_warning() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixture(dir.path(), "legacy_T1.json", "T1.json");

    let data = load_container_files(dir.path(), &["T1.json"], &VersionPolicy::default());
    let s = &data.students[0];
    assert_eq!(s.id, "12345");
    assert_eq!(s.group.as_deref(), Some("Grup Antic"));
    assert_eq!(s.term.as_deref(), Some("T1"));
    assert_eq!(s.source_display_name.as_deref(), Some("Grup_Antic_T1"));

    let info = &data.file_info["T1.json"];
    assert_eq!(info.display_name, "Grup_Antic_T1");
    assert_eq!(info.version, "0.0.0");

    assert_eq!(data.version_warnings.len(), 1);
    assert_eq!(data.version_warnings[0].kind, WarningKind::LegacyFormat);
    assert!(data.version_warnings[0].to_string().contains("legacy format"));
}

#[test]
fn null_and_sentinel_ids_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("nulls.json"),
        r#"{
            "grup": "3B",
            "trimestre": "T1",
            "estudiants": [
                {"id": null, "nom_cognoms": "Null Student", "materies": []},
                {"id": "", "nom_cognoms": "Empty Student", "materies": []},
                {"id": "NULL", "nom_cognoms": "Sentinel Student", "materies": []},
                {"id": "12345", "nom_cognoms": "Valid Student", "materies": []}
            ],
            "metrika_version": "1.0.0"
        }"#,
    )
    .unwrap();

    let data = load_container_files(dir.path(), &["nulls.json"], &VersionPolicy::default());
    assert_eq!(data.students.len(), 1);
    assert_eq!(data.students[0].id, "12345");
    assert_eq!(data.students[0].full_name, "Valid Student");
}

#[test]
fn numeric_ids_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("T2.json"),
        r#"[{"id": 12345, "nom_cognoms": "Joan", "materies": []}]"#,
    )
    .unwrap();

    let data = load_container_files(dir.path(), &["T2.json"], &VersionPolicy::default());
    assert_eq!(data.students[0].id, "12345");
}

#[test]
fn corrupted_and_missing_files_contribute_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("corrupted.json"), "{ invalid json }").unwrap();

    let data = load_container_files(
        dir.path(),
        &["corrupted.json", "nonexistent.json"],
        &VersionPolicy::default(),
    );
    assert!(data.students.is_empty());
    assert!(data.file_info.is_empty());
    let failed: Vec<_> = data.failures.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(failed, vec!["corrupted.json", "nonexistent.json"]);
}

#[test]
fn old_version_warns_below_minimum() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("old.json"), tagged_with_version("0.9.0")).unwrap();

    let data = load_container_files(dir.path(), &["old.json"], &VersionPolicy::default());
    assert_eq!(data.students.len(), 1);
    assert_eq!(data.version_warnings.len(), 1);
    assert_eq!(data.version_warnings[0].kind, WarningKind::BelowMinimum);
    assert_eq!(data.version_warnings[0].source, "old.json");
    assert!(data.version_warnings[0].message.contains("below minimum compatible"));
}

#[test]
fn newer_version_warns_ahead_of_current() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("new.json"), tagged_with_version("2.0.0")).unwrap();

    let data = load_container_files(dir.path(), &["new.json"], &VersionPolicy::default());
    assert_eq!(data.version_warnings.len(), 1);
    assert_eq!(data.version_warnings[0].kind, WarningKind::AheadOfCurrent);
    assert!(data.version_warnings[0].message.contains("ahead of current"));
}

#[test]
fn custom_policy_widens_the_window() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("old.json"), tagged_with_version("0.9.0")).unwrap();

    let policy = VersionPolicy::new("1.0.0", "0.9.0");
    let data = load_container_files(dir.path(), &["old.json"], &policy);
    assert!(data.version_warnings.is_empty());
}

#[test]
fn uploads_are_merged_like_files() {
    let tagged = fs::read("tests/fixtures/tagged_3b.json").unwrap();
    let legacy = fs::read("tests/fixtures/legacy_T1.json").unwrap();
    let files = vec![
        UploadedFile::new("test.json", tagged),
        UploadedFile::new("T1.json", legacy),
        UploadedFile::new("broken.json", b"not json".to_vec()),
    ];

    let data = load_uploaded_files(&files, &VersionPolicy::default());
    assert_eq!(data.students.len(), 2);
    assert_eq!(data.students[0].group.as_deref(), Some("3B"));
    assert_eq!(data.students[1].group.as_deref(), Some("Grup Antic"));
    assert_eq!(data.file_info.len(), 2);
    assert_eq!(data.version_warnings.len(), 1);
    assert_eq!(data.failures.len(), 1);
    assert_eq!(data.failures[0].file, "broken.json");
}

#[test]
fn directory_discovery_finds_only_json_sorted() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixture(dir.path(), "tagged_3b.json", "b.json");
    copy_fixture(dir.path(), "legacy_T1.json", "a.json");
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::create_dir(dir.path().join("nested.json")).unwrap();

    assert_eq!(discover_containers(dir.path()).unwrap(), vec!["a.json", "b.json"]);

    let data = load_directory(dir.path(), &VersionPolicy::default()).unwrap();
    assert_eq!(data.file_info.len(), 2);
    assert_eq!(data.students.len(), 2);

    let err = load_directory(dir.path().join("missing"), &VersionPolicy::default()).unwrap_err();
    assert!(matches!(err, ConversionError::MissingFile { .. }));
}

#[test]
fn converted_exports_load_and_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let opts = ConvertOptions {
        group: Some("3B".to_string()),
        ..Default::default()
    };
    convert_from_path(
        "tests/fixtures/sample_t1.csv",
        Some(&dir.path().join("3B_T1.json")),
        "T1",
        &opts,
    )
    .unwrap();

    let data = load_directory(dir.path(), &VersionPolicy::default()).unwrap();
    assert!(data.version_warnings.is_empty());

    let t1 = by_display_name(&data.students, "3B_T1");
    assert_eq!(t1.len(), 2);

    let counts = mark_counts(&t1);
    assert_eq!(counts.total(), 10);
    assert_eq!(counts.no_assoliment, 2);
    assert_eq!(counts.satisfactori, 3);
    assert_eq!(counts.notable, 3);
    assert_eq!(counts.excellent, 2);
    assert_eq!(counts.unclassified, 0);
}
