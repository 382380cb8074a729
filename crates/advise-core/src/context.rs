//! Shared state of one resolution run.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::beam::{parse_width, Beam};
use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::graph::GraphDatabase;
use crate::package::{PackageTuple, PackageVersion, StackInfo};
use crate::project::{Project, RuntimeEnvironment};

/// Stable handle to a registered package version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageVersionId(usize);

impl PackageVersionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Run-scoped data shared by the resolver, the predictor and pipeline units.
///
/// The context is the only writer of the package registry and the
/// dependents index.
pub struct Context {
    pub project: Project,
    pub beam: Beam,
    pub iteration: u64,
    pub accepted_final_states_count: u64,
    pub discarded_final_states_count: u64,
    /// Maximum number of final states (accepted or discarded) to produce
    pub limit: u64,
    /// Number of products to report
    pub count: usize,
    pub limit_latest_versions: Option<usize>,
    graph: Arc<dyn GraphDatabase + Sync>,
    registry: IndexMap<PackageTuple, PackageVersion>,
    dependents: IndexMap<String, IndexMap<PackageTuple, IndexSet<PackageTuple>>>,
    stack_info: Vec<StackInfo>,
    skipped_packages: IndexSet<String>,
    reported_rejections: HashSet<PackageTuple>,
}

impl Context {
    pub fn new(
        project: Project,
        graph: Arc<dyn GraphDatabase + Sync>,
        config: &ResolverConfig,
    ) -> Result<Self> {
        let beam = Beam::new(parse_width(config.beam_width)?)?.with_history(config.keep_history);

        Ok(Self {
            project,
            beam,
            iteration: 0,
            accepted_final_states_count: 0,
            discarded_final_states_count: 0,
            limit: config.limit,
            count: config.count,
            limit_latest_versions: config.limit_latest_versions,
            graph,
            registry: IndexMap::new(),
            dependents: IndexMap::new(),
            stack_info: Vec::new(),
            skipped_packages: IndexSet::new(),
            reported_rejections: HashSet::new(),
        })
    }

    pub fn graph(&self) -> &dyn GraphDatabase {
        self.graph.as_ref()
    }

    pub fn runtime_environment(&self) -> &RuntimeEnvironment {
        &self.project.runtime_environment
    }

    /// Register package metadata. An already known tuple keeps its entry.
    pub fn register_package_version(
        &mut self,
        package_version: PackageVersion,
    ) -> PackageVersionId {
        let tuple = package_version.to_tuple();
        if let Some(index) = self.registry.get_index_of(&tuple) {
            return PackageVersionId(index);
        }
        let (index, _) = self.registry.insert_full(tuple, package_version);
        PackageVersionId(index)
    }

    /// Register a tuple discovered as a dependency of `dependent`.
    ///
    /// A package needed outside development stays a non-development
    /// package, and extras requested along different paths accumulate.
    pub fn register_package_tuple(
        &mut self,
        tuple: &PackageTuple,
        dependent: Option<&PackageTuple>,
        develop: bool,
        extras: &[String],
        markers: Option<String>,
    ) -> PackageVersionId {
        let index = match self.registry.get_full_mut(tuple) {
            Some((index, _, existing)) => {
                existing.develop &= develop;
                for extra in extras {
                    if !existing.extras.contains(extra) {
                        existing.extras.push(extra.clone());
                    }
                }
                if existing.markers.is_none() {
                    existing.markers = markers;
                }
                index
            }
            None => {
                let package_version = PackageVersion::new(tuple, develop)
                    .with_extras(extras.to_vec())
                    .with_markers(markers);
                self.registry.insert_full(tuple.clone(), package_version).0
            }
        };

        if let Some(dependent) = dependent {
            self.dependents
                .entry(tuple.name.clone())
                .or_default()
                .entry(tuple.clone())
                .or_default()
                .insert(dependent.clone());
        }

        PackageVersionId(index)
    }

    /// Look up a registered tuple. A missing tuple is an internal error
    /// unless `graceful` is set.
    pub fn get_package_version(
        &self,
        tuple: &PackageTuple,
        graceful: bool,
    ) -> Result<Option<&PackageVersion>> {
        match self.registry.get(tuple) {
            Some(package_version) => Ok(Some(package_version)),
            None if graceful => Ok(None),
            None => Err(ResolverError::Internal(format!(
                "package {} was never registered",
                tuple
            ))),
        }
    }

    pub fn package_version(&self, id: PackageVersionId) -> Option<&PackageVersion> {
        self.registry.get_index(id.0).map(|(_, package_version)| package_version)
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Packages that pulled `tuple` in.
    pub fn dependents_of(&self, tuple: &PackageTuple) -> impl Iterator<Item = &PackageTuple> {
        self.dependents
            .get(&tuple.name)
            .and_then(|by_tuple| by_tuple.get(tuple))
            .into_iter()
            .flatten()
    }

    /// Every known version of `name` that something depends on.
    pub fn dependents_by_name(
        &self,
        name: &str,
    ) -> Option<&IndexMap<PackageTuple, IndexSet<PackageTuple>>> {
        self.dependents.get(name)
    }

    pub fn add_stack_info(&mut self, entry: StackInfo) {
        if !self.stack_info.contains(&entry) {
            self.stack_info.push(entry);
        }
    }

    pub fn stack_info(&self) -> &[StackInfo] {
        &self.stack_info
    }

    /// Drop a package name from the rest of the run.
    pub fn skip_package(&mut self, name: &str) {
        if self.skipped_packages.insert(name.to_string()) {
            debug!("Package {} removed from resolution", name);
        }
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped_packages.contains(name)
    }

    pub fn skipped_packages(&self) -> impl Iterator<Item = &str> {
        self.skipped_packages.iter().map(String::as_str)
    }

    /// True the first time a rejection is reported for `tuple`.
    pub fn first_rejection(&mut self, tuple: &PackageTuple) -> bool {
        self.reported_rejections.insert(tuple.clone())
    }

    pub fn final_states_count(&self) -> u64 {
        self.accepted_final_states_count + self.discarded_final_states_count
    }

    pub fn limit_reached(&self) -> bool {
        self.final_states_count() >= self.limit
    }
}
