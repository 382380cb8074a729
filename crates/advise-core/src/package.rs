//! Package identities and metadata.

use std::cmp::Ordering;
use std::fmt;

use advise_version::Comparator;
use serde::{Deserialize, Serialize};

/// Normalize a Python package name: lowercase, with runs of `-`, `_` and `.`
/// collapsed into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.push(c.to_ascii_lowercase());
    }

    normalized
}

/// The identity of one concrete package release: name, version and the index
/// it is served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageTuple {
    pub name: String,
    pub version: String,
    pub index_url: String,
}

impl PackageTuple {
    pub fn new(
        name: impl AsRef<str>,
        version: impl Into<String>,
        index_url: impl Into<String>,
    ) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            version: version.into(),
            index_url: index_url.into(),
        }
    }

    /// Same name and version, regardless of the index.
    pub fn same_release(&self, other: &PackageTuple) -> bool {
        self.name == other.name && Comparator::equal_to(&self.version, &other.version)
    }
}

impl fmt::Display for PackageTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}@{}", self.name, self.version, self.index_url)
    }
}

/// Order tuples newest version first, keeping the input order for ties.
pub fn sort_latest_first(tuples: &mut [PackageTuple]) {
    tuples.sort_by(|a, b| compare_versions_descending(&a.version, &b.version));
}

pub(crate) fn compare_versions_descending(a: &str, b: &str) -> Ordering {
    Comparator::ordering(a, b).reverse()
}

/// Metadata for a registered package tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub name: String,
    pub version: String,
    pub index_url: String,
    /// Pulled in only for development
    #[serde(default)]
    pub develop: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    /// Environment marker on the edge that introduced this package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
}

impl PackageVersion {
    pub fn new(tuple: &PackageTuple, develop: bool) -> Self {
        Self {
            name: tuple.name.clone(),
            version: tuple.version.clone(),
            index_url: tuple.index_url.clone(),
            develop,
            extras: Vec::new(),
            markers: None,
        }
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_markers(mut self, markers: Option<String>) -> Self {
        self.markers = markers;
        self
    }

    pub fn to_tuple(&self) -> PackageTuple {
        PackageTuple {
            name: self.name.clone(),
            version: self.version.clone(),
            index_url: self.index_url.clone(),
        }
    }

    /// Pinned form as used in lock files, e.g. `==1.0.0`
    pub fn locked_version(&self) -> String {
        format!("=={}", self.version)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}@{}", self.name, self.version, self.index_url)
    }
}

/// Severity of a justification or stack info entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JustificationType {
    Info,
    Warning,
    Error,
}

/// A human readable record explaining why a stack looks the way it does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Justification {
    #[serde(rename = "type")]
    pub kind: JustificationType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl Justification {
    pub fn new(kind: JustificationType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            link: None,
            package_name: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Error, message)
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_package(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }
}

/// Stack info entries share the justification shape.
pub type StackInfo = Justification;
