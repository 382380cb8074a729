//! Pipeline units consulted by the resolver.
//!
//! Every unit kind has its own trait with the exact call contract the
//! resolver drives. Units report decisions through [`Verdict`]; an `Err`
//! from a unit is a failure of the unit itself and ends the run.

mod boots;
mod sieves;
mod steps;
mod strides;
mod wraps;

pub use boots::RuntimeEnvironmentBoot;
pub use sieves::{CutPreReleasesSieve, PackageIndexSieve, SkipPackageSieve};
pub use steps::VersionPenalizationStep;
pub use strides::ScoreThresholdStride;
pub use wraps::ReportHashesWrap;

use crate::config::ResolverConfig;
use crate::context::Context;
use crate::package::{Justification, PackageTuple, PackageVersion};
use crate::state::State;

/// Outcome of a unit call.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Accept(T),
    /// Prune this candidate or branch
    Reject(String),
    /// Drop the package name from the whole resolution
    SkipPackage(String),
    /// End the resolution early, keeping what was already accepted
    StopPipeline(String),
}

impl<T> Verdict<T> {
    pub fn reject(reason: impl Into<String>) -> Self {
        Verdict::Reject(reason.into())
    }

    pub fn skip_package(reason: impl Into<String>) -> Self {
        Verdict::SkipPackage(reason.into())
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Verdict::StopPipeline(reason.into())
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }
}

pub type UnitResult<T> = anyhow::Result<Verdict<T>>;

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Behaviour shared by all unit kinds.
pub trait Unit: Send {
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Called once before resolution starts.
    fn pre_run(&mut self, _context: &Context) {}

    /// Called once after resolution ends.
    fn post_run(&mut self, _context: &Context) {}
}

/// Runs once before resolution; may record stack info.
pub trait Boot: Unit {
    fn run(&mut self, context: &mut Context) -> UnitResult<()>;
}

/// Offers alternative package identities for a candidate.
pub trait Pseudonym: Unit {
    fn run(
        &mut self,
        context: &Context,
        package_version: &PackageVersion,
    ) -> anyhow::Result<Vec<PackageTuple>>;
}

/// Filters candidate versions of one dependency.
pub trait Sieve: Unit {
    fn run(
        &mut self,
        context: &Context,
        package_versions: Vec<PackageVersion>,
    ) -> UnitResult<Vec<PackageVersion>>;
}

/// Score contribution of a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    pub score: Option<f64>,
    pub justification: Vec<Justification>,
}

impl StepResult {
    pub fn score(score: f64) -> Self {
        Self {
            score: Some(score),
            justification: Vec::new(),
        }
    }

    pub fn with_justification(mut self, justification: Justification) -> Self {
        self.justification.push(justification);
        self
    }
}

/// Scores, or vetoes, adding a package version to a state.
pub trait Step: Unit {
    /// Steps are consulted only the first time a name gets resolved in a
    /// state lineage unless this returns true.
    fn multi_package_resolutions(&self) -> bool {
        false
    }

    fn run(
        &mut self,
        context: &Context,
        state: &State,
        package_version: &PackageVersion,
    ) -> UnitResult<Option<StepResult>>;
}

/// Accepts or discards a final state.
pub trait Stride: Unit {
    fn run(&mut self, context: &Context, state: &State) -> UnitResult<()>;
}

/// Decorates an accepted final state.
pub trait Wrap: Unit {
    fn run(&mut self, context: &Context, state: &mut State) -> anyhow::Result<()>;
}

macro_rules! for_each_unit {
    ($pipeline:expr, $unit:ident => $body:expr) => {
        for $unit in $pipeline.boots.iter_mut() {
            $body;
        }
        for $unit in $pipeline.pseudonyms.iter_mut() {
            $body;
        }
        for $unit in $pipeline.sieves.iter_mut() {
            $body;
        }
        for $unit in $pipeline.steps.iter_mut() {
            $body;
        }
        for $unit in $pipeline.strides.iter_mut() {
            $body;
        }
        for $unit in $pipeline.wraps.iter_mut() {
            $body;
        }
    };
}

/// Ordered collections of units. Units of one kind run in insertion order.
#[derive(Default)]
pub struct Pipeline {
    pub boots: Vec<Box<dyn Boot>>,
    pub pseudonyms: Vec<Box<dyn Pseudonym>>,
    pub sieves: Vec<Box<dyn Sieve>>,
    pub steps: Vec<Box<dyn Step>>,
    pub strides: Vec<Box<dyn Stride>>,
    pub wraps: Vec<Box<dyn Wrap>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The built-in units enabled by a configuration.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut builder = Pipeline::builder()
            .boot(RuntimeEnvironmentBoot)
            .sieve(CutPreReleasesSieve::new(
                config.allow_prereleases,
                config.prerelease_packages.iter().cloned(),
            ));

        if !config.skip_packages.is_empty() {
            builder = builder.sieve(SkipPackageSieve::new(config.skip_packages.iter().cloned()));
        }
        if !config.index_urls.is_empty() {
            builder = builder.sieve(PackageIndexSieve::new(config.index_urls.clone()));
        }

        builder = builder.step(VersionPenalizationStep::default());

        if let Some(threshold) = config.score_threshold {
            builder = builder.stride(ScoreThresholdStride::new(threshold));
        }

        builder.wrap(ReportHashesWrap).build()
    }

    pub fn is_empty(&self) -> bool {
        self.boots.is_empty()
            && self.pseudonyms.is_empty()
            && self.sieves.is_empty()
            && self.steps.is_empty()
            && self.strides.is_empty()
            && self.wraps.is_empty()
    }

    pub fn pre_run(&mut self, context: &Context) {
        for_each_unit!(self, unit => unit.pre_run(context));
    }

    pub fn post_run(&mut self, context: &Context) {
        for_each_unit!(self, unit => unit.post_run(context));
    }

    /// Unit names per kind, for logging.
    pub fn describe(&self) -> String {
        fn names<'a>(units: impl Iterator<Item = &'a str>) -> String {
            units.collect::<Vec<_>>().join(", ")
        }

        format!(
            "boots=[{}] pseudonyms=[{}] sieves=[{}] steps=[{}] strides=[{}] wraps=[{}]",
            names(self.boots.iter().map(|u| u.name())),
            names(self.pseudonyms.iter().map(|u| u.name())),
            names(self.sieves.iter().map(|u| u.name())),
            names(self.steps.iter().map(|u| u.name())),
            names(self.strides.iter().map(|u| u.name())),
            names(self.wraps.iter().map(|u| u.name())),
        )
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    pub fn boot(mut self, unit: impl Boot + 'static) -> Self {
        self.pipeline.boots.push(Box::new(unit));
        self
    }

    pub fn pseudonym(mut self, unit: impl Pseudonym + 'static) -> Self {
        self.pipeline.pseudonyms.push(Box::new(unit));
        self
    }

    pub fn sieve(mut self, unit: impl Sieve + 'static) -> Self {
        self.pipeline.sieves.push(Box::new(unit));
        self
    }

    pub fn step(mut self, unit: impl Step + 'static) -> Self {
        self.pipeline.steps.push(Box::new(unit));
        self
    }

    pub fn stride(mut self, unit: impl Stride + 'static) -> Self {
        self.pipeline.strides.push(Box::new(unit));
        self
    }

    pub fn wrap(mut self, unit: impl Wrap + 'static) -> Self {
        self.pipeline.wraps.push(Box::new(unit));
        self
    }

    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}
