use std::fs;
use std::path::Path;

use advise_version::Comparator;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::{DependencyMap, GraphDatabase, GraphError, PackageVersionRecord};
use crate::error::Result;
use crate::package::{normalize_name, PackageTuple};
use crate::project::RuntimeEnvironment;

fn default_true() -> bool {
    true
}

/// An edge from a solved package to one of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub name: String,
    /// Version specifier, `*` or empty for any
    #[serde(default)]
    pub specifier: String,
    /// Extra that pulls the dependency in; `None` for unconditional edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Precomputed result of evaluating `marker` against the target
    /// environment; edges without one are treated as applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_evaluation_result: Option<bool>,
}

impl DependencyEdge {
    pub fn new(name: &str, specifier: &str) -> Self {
        Self {
            name: normalize_name(name),
            specifier: specifier.to_string(),
            extra: None,
            marker: None,
            marker_evaluation_result: None,
        }
    }

    pub fn for_extra(mut self, extra: &str) -> Self {
        self.extra = Some(extra.to_string());
        self
    }

    pub fn with_marker(mut self, marker: &str, evaluation_result: bool) -> Self {
        self.marker = Some(marker.to_string());
        self.marker_evaluation_result = Some(evaluation_result);
        self
    }
}

/// A package release known to the graph together with its dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedPackage {
    pub name: String,
    pub version: String,
    pub index_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    /// False while the dependency sub-graph is still pending
    #[serde(default = "default_true")]
    pub solved: bool,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default)]
    pub hashes: Vec<String>,
}

impl SolvedPackage {
    pub fn depends_on(&mut self, name: &str, specifier: &str) -> &mut Self {
        self.dependencies.push(DependencyEdge::new(name, specifier));
        self
    }

    pub fn add_edge(&mut self, edge: DependencyEdge) -> &mut Self {
        self.dependencies.push(edge);
        self
    }

    pub fn with_hashes(&mut self, hashes: &[&str]) -> &mut Self {
        self.hashes = hashes.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn for_environment(
        &mut self,
        os_name: Option<&str>,
        os_version: Option<&str>,
        python_version: Option<&str>,
    ) -> &mut Self {
        self.os_name = os_name.map(str::to_string);
        self.os_version = os_version.map(str::to_string);
        self.python_version = python_version.map(str::to_string);
        self
    }

    /// Mark the dependency sub-graph as not computed yet
    pub fn unsolved(&mut self) -> &mut Self {
        self.solved = false;
        self
    }

    fn matches(&self, tuple: &PackageTuple) -> bool {
        self.name == tuple.name
            && self.version == tuple.version
            && self.index_url == tuple.index_url
    }

    // Unset fields on either side match anything
    fn matches_environment(&self, environment: &RuntimeEnvironment) -> bool {
        fn field(record: &Option<String>, wanted: Option<&str>) -> bool {
            match (record.as_deref(), wanted) {
                (Some(record), Some(wanted)) => record == wanted,
                _ => true,
            }
        }

        field(&self.os_name, environment.os_name())
            && field(&self.os_version, environment.os_version())
            && field(&self.python_version, environment.python_version())
    }

    fn to_tuple(&self) -> PackageTuple {
        PackageTuple::new(&self.name, self.version.clone(), self.index_url.clone())
    }

    fn to_record(&self) -> PackageVersionRecord {
        PackageVersionRecord {
            package_name: self.name.clone(),
            package_version: self.version.clone(),
            index_url: self.index_url.clone(),
            os_name: self.os_name.clone(),
            os_version: self.os_version.clone(),
            python_version: self.python_version.clone(),
        }
    }
}

/// In-memory graph snapshot, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGraph {
    #[serde(default)]
    packages: Vec<SolvedPackage>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut graph: MemoryGraph = serde_json::from_str(content)?;
        for package in &mut graph.packages {
            package.name = normalize_name(&package.name);
            for edge in &mut package.dependencies {
                edge.name = normalize_name(&edge.name);
            }
        }
        Ok(graph)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Register a release and return it for adding edges.
    pub fn add_package(
        &mut self,
        name: &str,
        version: &str,
        index_url: &str,
    ) -> &mut SolvedPackage {
        self.packages.push(SolvedPackage {
            name: normalize_name(name),
            version: version.to_string(),
            index_url: index_url.to_string(),
            os_name: None,
            os_version: None,
            python_version: None,
            solved: true,
            dependencies: Vec::new(),
            hashes: Vec::new(),
        });
        let last = self.packages.len() - 1;
        &mut self.packages[last]
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn find(&self, package: &PackageTuple) -> Option<&SolvedPackage> {
        self.packages.iter().find(|p| p.matches(package))
    }

    fn find_edge(
        &self,
        package: &PackageTuple,
        dependency_name: &str,
        dependency_version: &str,
    ) -> std::result::Result<&DependencyEdge, GraphError> {
        let dependency_name = normalize_name(dependency_name);
        self.find(package)
            .and_then(|p| {
                p.dependencies
                    .iter()
                    .find(|e| e.name == dependency_name && e.specifier == dependency_version)
            })
            .ok_or_else(|| {
                GraphError::not_found(format!(
                    "{} -> {} {}",
                    package, dependency_name, dependency_version
                ))
            })
    }
}

impl GraphDatabase for MemoryGraph {
    fn get_solved_python_package_versions_all(
        &self,
        package_name: &str,
        environment: &RuntimeEnvironment,
    ) -> std::result::Result<Vec<PackageTuple>, GraphError> {
        let name = normalize_name(package_name);
        let tuples: IndexSet<PackageTuple> = self
            .packages
            .iter()
            .filter(|p| p.name == name && p.solved && p.matches_environment(environment))
            .map(SolvedPackage::to_tuple)
            .collect();

        Ok(tuples.into_iter().collect())
    }

    fn get_depends_on(
        &self,
        package: &PackageTuple,
        environment: &RuntimeEnvironment,
        extras: &[Option<String>],
        marker_evaluation_result: Option<bool>,
    ) -> std::result::Result<DependencyMap, GraphError> {
        let record = self
            .packages
            .iter()
            .find(|p| p.matches(package) && p.matches_environment(environment))
            .filter(|p| p.solved)
            .ok_or_else(|| GraphError::not_found(package))?;

        let mut result = DependencyMap::new();
        for edge in &record.dependencies {
            if !extras.contains(&edge.extra) {
                continue;
            }

            if let (Some(expected), Some(_)) = (marker_evaluation_result, &edge.marker) {
                let evaluated = self.get_python_environment_marker_evaluation_result(
                    package,
                    &edge.name,
                    &edge.specifier,
                    environment,
                )?;
                if evaluated != expected {
                    continue;
                }
            }

            result
                .entry(edge.extra.clone())
                .or_default()
                .push((edge.name.clone(), edge.specifier.clone()));
        }

        Ok(result)
    }

    fn get_python_package_version_records(
        &self,
        package_name: &str,
        package_version: Option<&str>,
        index_url: Option<&str>,
        environment: &RuntimeEnvironment,
    ) -> std::result::Result<Vec<PackageVersionRecord>, GraphError> {
        let name = normalize_name(package_name);
        let records = self
            .packages
            .iter()
            .filter(|p| p.name == name && p.matches_environment(environment))
            .filter(|p| package_version.map_or(true, |v| Comparator::equal_to(&p.version, v)))
            .filter(|p| index_url.map_or(true, |i| p.index_url == i))
            .map(SolvedPackage::to_record)
            .collect();

        Ok(records)
    }

    fn get_python_environment_marker(
        &self,
        package: &PackageTuple,
        dependency_name: &str,
        dependency_version: &str,
        _environment: &RuntimeEnvironment,
    ) -> std::result::Result<Option<String>, GraphError> {
        Ok(self
            .find_edge(package, dependency_name, dependency_version)?
            .marker
            .clone())
    }

    fn get_python_environment_marker_evaluation_result(
        &self,
        package: &PackageTuple,
        dependency_name: &str,
        dependency_version: &str,
        _environment: &RuntimeEnvironment,
    ) -> std::result::Result<bool, GraphError> {
        Ok(self
            .find_edge(package, dependency_name, dependency_version)?
            .marker_evaluation_result
            .unwrap_or(true))
    }

    fn get_python_package_hashes_sha256(
        &self,
        package: &PackageTuple,
    ) -> std::result::Result<Vec<String>, GraphError> {
        self.find(package)
            .map(|p| p.hashes.clone())
            .ok_or_else(|| GraphError::not_found(package))
    }
}
