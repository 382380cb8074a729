use std::collections::HashMap;

use indexmap::IndexSet;

use super::{Step, StepResult, Unit, UnitResult, Verdict};
use crate::context::Context;
use crate::package::{compare_versions_descending, Justification, PackageVersion};
use crate::state::State;

const DEFAULT_PENALTY: f64 = 0.05;

/// Penalizes candidates by how many newer releases of the same package the
/// graph knows about.
#[derive(Debug)]
pub struct VersionPenalizationStep {
    penalty: f64,
    known_versions: HashMap<String, Vec<String>>,
}

impl Default for VersionPenalizationStep {
    fn default() -> Self {
        Self::new(DEFAULT_PENALTY)
    }
}

impl VersionPenalizationStep {
    pub fn new(penalty: f64) -> Self {
        Self {
            penalty,
            known_versions: HashMap::new(),
        }
    }

    fn newer_releases(
        &mut self,
        context: &Context,
        package_version: &PackageVersion,
    ) -> anyhow::Result<usize> {
        if !self.known_versions.contains_key(&package_version.name) {
            let records = context.graph().get_python_package_version_records(
                &package_version.name,
                None,
                None,
                context.runtime_environment(),
            )?;
            let mut versions: Vec<String> = records
                .into_iter()
                .map(|r| r.package_version)
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect();
            versions.sort_by(|a, b| compare_versions_descending(a, b));
            self.known_versions.insert(package_version.name.clone(), versions);
        }

        let versions = &self.known_versions[&package_version.name];
        Ok(versions
            .iter()
            .take_while(|v| compare_versions_descending(v, &package_version.version).is_lt())
            .count())
    }
}

impl Unit for VersionPenalizationStep {
    fn pre_run(&mut self, _context: &Context) {
        self.known_versions.clear();
    }
}

impl Step for VersionPenalizationStep {
    fn run(
        &mut self,
        context: &Context,
        _state: &State,
        package_version: &PackageVersion,
    ) -> UnitResult<Option<StepResult>> {
        let newer = self.newer_releases(context, package_version)?;
        if newer == 0 {
            return Ok(Verdict::Accept(None));
        }

        let result = StepResult::score(-self.penalty * newer as f64).with_justification(
            Justification::info(format!(
                "Using {} of {}; {} newer release(s) known",
                package_version.version, package_version.name, newer
            ))
            .with_package(package_version.name.clone()),
        );
        Ok(Verdict::Accept(Some(result)))
    }
}
