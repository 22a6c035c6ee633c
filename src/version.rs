//! Schema version parsing and compatibility reconciliation.
//!
//! Versions are compared as numeric tuples. When one version is a prefix of the other,
//! the shorter one is older: `1.0 < 1.0.0`. Malformed strings are read as `0.0.0`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema version written into new containers.
pub const CURRENT_VERSION: &str = "1.0.0";

/// Oldest container version the loader considers fully compatible.
pub const MIN_COMPATIBLE_VERSION: &str = "1.0.0";

/// Implicit version of legacy (bare array) containers.
pub const LEGACY_VERSION: &str = "0.0.0";

/// A dotted numeric version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// Parse `N(.N)*`. Anything else yields `0.0.0`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let parsed: Option<Vec<u64>> = s.split('.').map(|seg| seg.parse::<u64>().ok()).collect();
        match parsed {
            Some(parts) if !s.is_empty() => Self(parts),
            _ => Self::zero(),
        }
    }

    pub fn zero() -> Self {
        Self(vec![0, 0, 0])
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

/// The running system's version window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    pub current: String,
    pub min_compatible: String,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            current: CURRENT_VERSION.to_string(),
            min_compatible: MIN_COMPATIBLE_VERSION.to_string(),
        }
    }
}

impl VersionPolicy {
    pub fn new(current: impl Into<String>, min_compatible: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            min_compatible: min_compatible.into(),
        }
    }
}

/// Why a container was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Declared version is older than the minimum compatible version.
    BelowMinimum,
    /// Declared version is newer than the running version.
    AheadOfCurrent,
    /// The container is a bare record list without metadata.
    LegacyFormat,
}

/// Non-fatal, informational compatibility notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityWarning {
    pub kind: WarningKind,
    /// File or upload name the warning refers to.
    pub source: String,
    pub message: String,
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Check a declared container version against `policy`.
///
/// Returns at most one warning and never fails.
pub fn reconcile(
    source: &str,
    declared: &str,
    policy: &VersionPolicy,
) -> Option<CompatibilityWarning> {
    let declared_v = Version::parse(declared);
    let min = Version::parse(&policy.min_compatible);
    let current = Version::parse(&policy.current);

    if declared_v < min {
        Some(CompatibilityWarning {
            kind: WarningKind::BelowMinimum,
            source: source.to_string(),
            message: format!(
                "{source}: version {declared_v} is below minimum compatible version {min}; some data may not display correctly"
            ),
        })
    } else if declared_v > current {
        Some(CompatibilityWarning {
            kind: WarningKind::AheadOfCurrent,
            source: source.to_string(),
            message: format!(
                "{source}: version {declared_v} is ahead of current version {current}; consider upgrading"
            ),
        })
    } else {
        None
    }
}

/// Warning emitted for bare-array containers.
pub fn legacy_format_warning(source: &str) -> CompatibilityWarning {
    CompatibilityWarning {
        kind: WarningKind::LegacyFormat,
        source: source.to_string(),
        message: format!(
            "{source}: legacy format without group/term metadata (version {LEGACY_VERSION}); reconvert to upgrade"
        ),
    }
}
