//! Loading and merging persisted containers.
//!
//! Every load is a fresh transform of the files on disk (or uploaded bytes):
//!
//! - tagged containers tag their students with `grup`, `trimestre` and the display name
//!   `{grup}_{trimestre}`, and are checked against the [`VersionPolicy`]
//! - legacy bare lists take their term from the file name, belong to the synthetic
//!   group `Grup Antic`, and always produce one legacy-format warning
//! - students whose id is empty or the `NULL` sentinel are dropped silently
//! - files that cannot be read or parsed contribute nothing; they are listed in
//!   [`LoadedData::failures`] and never abort the load

use std::collections::BTreeMap;
use std::path::Path;

use crate::container::Container;
use crate::error::{ConversionError, ConversionResult};
use crate::types::StudentRecord;
use crate::version::{CompatibilityWarning, LEGACY_VERSION, VersionPolicy, legacy_format_warning, reconcile};

/// Group assigned to students from legacy containers.
pub const LEGACY_GROUP: &str = "Grup Antic";

/// Metadata about one loaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub display_name: String,
    pub group: String,
    pub term: String,
    pub version: String,
}

/// A file that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub file: String,
    pub message: String,
}

/// Merged view over one or more containers.
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    /// Students in file order, then container order.
    pub students: Vec<StudentRecord>,
    /// Keyed by file (or upload) name.
    pub file_info: BTreeMap<String, FileInfo>,
    pub version_warnings: Vec<CompatibilityWarning>,
    pub failures: Vec<LoadFailure>,
}

/// An in-memory file, e.g. from a browser upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Load the named files from `dir` and merge them.
pub fn load_container_files<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    names: &[S],
    policy: &VersionPolicy,
) -> LoadedData {
    let dir = dir.as_ref();
    let mut data = LoadedData::default();
    for name in names {
        let name = name.as_ref();
        match Container::read_from_path(dir.join(name)) {
            Ok(container) => merge_container(&mut data, name, container, policy),
            Err(e) => data.failures.push(LoadFailure {
                file: name.to_string(),
                message: e.to_string(),
            }),
        }
    }
    data
}

/// Merge in-memory uploads.
pub fn load_uploaded_files(files: &[UploadedFile], policy: &VersionPolicy) -> LoadedData {
    let mut data = LoadedData::default();
    for file in files {
        match Container::from_json_slice(&file.bytes) {
            Ok(container) => merge_container(&mut data, &file.name, container, policy),
            Err(e) => data.failures.push(LoadFailure {
                file: file.name.clone(),
                message: e.to_string(),
            }),
        }
    }
    data
}

/// Names of the `*.json` files directly inside `dir`, sorted.
pub fn discover_containers(dir: impl AsRef<Path>) -> ConversionResult<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ConversionError::MissingFile {
            path: dir.to_path_buf(),
        });
    }
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| ConversionError::Format {
        message: format!("invalid search pattern '{pattern}': {e}"),
    })?;

    let mut names: Vec<String> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    names.sort();
    Ok(names)
}

/// Discover and load every container in `dir`.
pub fn load_directory(dir: impl AsRef<Path>, policy: &VersionPolicy) -> ConversionResult<LoadedData> {
    let dir = dir.as_ref();
    let names = discover_containers(dir)?;
    Ok(load_container_files(dir, &names, policy))
}

/// Merge one parsed container into `data`.
pub fn merge_container(data: &mut LoadedData, name: &str, container: Container, policy: &VersionPolicy) {
    let (info, students) = match container {
        Container::Tagged(c) => {
            data.version_warnings
                .extend(reconcile(name, &c.schema_version, policy));
            let info = FileInfo {
                display_name: format!("{}_{}", c.group, c.term),
                group: c.group,
                term: c.term,
                version: c.schema_version,
            };
            (info, c.students)
        }
        Container::Bare(students) => {
            data.version_warnings.push(legacy_format_warning(name));
            let term = legacy_term(name);
            let info = FileInfo {
                display_name: format!("{}_{}", LEGACY_GROUP.replace(' ', "_"), term),
                group: LEGACY_GROUP.to_string(),
                term,
                version: LEGACY_VERSION.to_string(),
            };
            (info, students)
        }
    };

    data.students.extend(
        students
            .into_iter()
            .filter(|s| !s.has_sentinel_id())
            .map(|mut s| {
                s.group = Some(info.group.clone());
                s.term = Some(info.term.clone());
                s.source_display_name = Some(info.display_name.clone());
                s
            }),
    );
    data.file_info.insert(name.to_string(), info);
}

fn legacy_term(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::WarningKind;

    #[test]
    fn merge_tags_tagged_students() {
        let mut data = LoadedData::default();
        let c = Container::tagged(
            "3B",
            "Primer trimestre",
            vec![StudentRecord::new("12345", "Joan Pérez García")],
            "1.0.0",
        );
        merge_container(&mut data, "test_new.json", c, &VersionPolicy::default());

        assert_eq!(data.students.len(), 1);
        let s = &data.students[0];
        assert_eq!(s.group.as_deref(), Some("3B"));
        assert_eq!(s.term.as_deref(), Some("Primer trimestre"));
        assert_eq!(s.source_display_name.as_deref(), Some("3B_Primer trimestre"));
        assert_eq!(data.file_info["test_new.json"].version, "1.0.0");
        assert!(data.version_warnings.is_empty());
    }

    #[test]
    fn merge_bare_uses_file_stem_and_warns_once() {
        let mut data = LoadedData::default();
        let c = Container::Bare(vec![StudentRecord::new("12345", "Joan")]);
        merge_container(&mut data, "T1.json", c, &VersionPolicy::default());

        let s = &data.students[0];
        assert_eq!(s.group.as_deref(), Some("Grup Antic"));
        assert_eq!(s.term.as_deref(), Some("T1"));
        assert_eq!(s.source_display_name.as_deref(), Some("Grup_Antic_T1"));
        assert_eq!(data.file_info["T1.json"].version, "0.0.0");
        assert_eq!(data.version_warnings.len(), 1);
        assert_eq!(data.version_warnings[0].kind, WarningKind::LegacyFormat);
    }

    #[test]
    fn sentinel_ids_are_filtered() {
        let mut data = LoadedData::default();
        let c = Container::tagged(
            "3B",
            "T1",
            vec![
                StudentRecord::new("NULL", "a"),
                StudentRecord::new("null", "b"),
                StudentRecord::new("", "c"),
                StudentRecord::new("12345", "d"),
            ],
            "1.0.0",
        );
        merge_container(&mut data, "x.json", c, &VersionPolicy::default());
        let ids: Vec<_> = data.students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["12345"]);
    }
}
