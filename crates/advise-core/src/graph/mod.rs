//! Dependency graph service consumed by the resolver.
//!
//! The resolver never stores dependency facts itself. Every question about
//! which versions exist, what they depend on and under which environment
//! markers goes through [`GraphDatabase`].

mod memory;

pub use memory::{DependencyEdge, MemoryGraph, SolvedPackage};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::PackageTuple;
use crate::project::RuntimeEnvironment;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The dependency sub-graph for this package has not been solved yet
    #[error("No solved dependency information for {package}")]
    NotFound { package: String },

    #[error("Graph backend failure: {0}")]
    Backend(String),
}

impl GraphError {
    pub fn not_found(package: impl ToString) -> Self {
        GraphError::NotFound {
            package: package.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NotFound { .. })
    }
}

/// Dependencies of one package grouped by the extra that pulls them in; the
/// `None` key holds the unconditional ones. Each entry is
/// `(dependency name, version specifier)`.
pub type DependencyMap = IndexMap<Option<String>, Vec<(String, String)>>;

/// One solved package release as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersionRecord {
    pub package_name: String,
    pub package_version: String,
    pub index_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
}

impl PackageVersionRecord {
    pub fn to_tuple(&self) -> PackageTuple {
        PackageTuple::new(
            &self.package_name,
            self.package_version.clone(),
            self.index_url.clone(),
        )
    }
}

/// Queries the resolver issues against the knowledge graph.
pub trait GraphDatabase: Send {
    /// All solved releases of a package for the given environment.
    fn get_solved_python_package_versions_all(
        &self,
        package_name: &str,
        environment: &RuntimeEnvironment,
    ) -> Result<Vec<PackageTuple>, GraphError>;

    /// Direct dependencies of a package. With `marker_evaluation_result`
    /// set, only edges without a marker or whose marker evaluated to that
    /// value are returned.
    fn get_depends_on(
        &self,
        package: &PackageTuple,
        environment: &RuntimeEnvironment,
        extras: &[Option<String>],
        marker_evaluation_result: Option<bool>,
    ) -> Result<DependencyMap, GraphError>;

    /// Solved records matching a name, optionally narrowed by version and
    /// index.
    fn get_python_package_version_records(
        &self,
        package_name: &str,
        package_version: Option<&str>,
        index_url: Option<&str>,
        environment: &RuntimeEnvironment,
    ) -> Result<Vec<PackageVersionRecord>, GraphError>;

    /// Marker on the edge from `package` to the named dependency, if any.
    fn get_python_environment_marker(
        &self,
        package: &PackageTuple,
        dependency_name: &str,
        dependency_version: &str,
        environment: &RuntimeEnvironment,
    ) -> Result<Option<String>, GraphError>;

    fn get_python_environment_marker_evaluation_result(
        &self,
        package: &PackageTuple,
        dependency_name: &str,
        dependency_version: &str,
        environment: &RuntimeEnvironment,
    ) -> Result<bool, GraphError>;

    fn get_python_package_hashes_sha256(
        &self,
        package: &PackageTuple,
    ) -> Result<Vec<String>, GraphError>;
}
