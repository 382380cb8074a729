//! Resolver scenario tests.
//!
//! Every test runs a complete resolution against a small in-memory graph
//! with a hand-built pipeline and a recording predictor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use super::*;
use crate::graph::{DependencyEdge, MemoryGraph};
use crate::pipeline::{
    Boot, Pseudonym, ScoreThresholdStride, Sieve, SkipPackageSieve, Step, StepResult, Stride, Unit,
    UnitResult, VersionPenalizationStep,
};
use crate::project::{Requirement, RuntimeEnvironment};
use crate::state::StateId;

const INDEX: &str = "https://pypi.org/simple";

#[derive(Debug, Default)]
struct Log {
    rewards: Vec<(String, f64)>,
    finalized: Vec<StateId>,
    pre_run: bool,
    post_run: bool,
}

impl Log {
    fn nan_rewards(&self) -> Vec<&str> {
        self.rewards
            .iter()
            .filter(|(_, reward)| reward.is_nan())
            .map(|(tuple, _)| tuple.as_str())
            .collect()
    }
}

/// Expands the last added state (falling back to the best one), picking
/// the first pending tuple whose name comes first in `prefer`.
struct RecordingPredictor {
    prefer: Vec<String>,
    log: Arc<Mutex<Log>>,
}

impl RecordingPredictor {
    fn new(prefer: &[&str]) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let predictor = Self {
            prefer: prefer.iter().map(|s| s.to_string()).collect(),
            log: Arc::clone(&log),
        };
        (predictor, log)
    }
}

impl Predictor for RecordingPredictor {
    fn name(&self) -> &'static str {
        "RecordingPredictor"
    }

    fn pre_run(&mut self, _context: &Context) {
        self.log.lock().unwrap().pre_run = true;
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = match context.beam.get_last() {
            Some(state) => state,
            None => context.beam.max()?,
        };
        let pending = state.unresolved_dependencies().values().flatten();
        let preferred = self
            .prefer
            .iter()
            .find_map(|name| pending.clone().find(|t| &t.name == name))
            .or_else(|| state.get_first_unresolved_dependency())
            .cloned()
            .ok_or_else(|| ResolverError::Internal("nothing to expand".to_string()))?;
        Ok((state.id(), preferred))
    }

    fn set_reward_signal(
        &mut self,
        _context: &Context,
        _state: &State,
        package_tuple: &PackageTuple,
        reward: f64,
    ) {
        self.log.lock().unwrap().rewards.push((package_tuple.to_string(), reward));
    }

    fn finalize_state(&mut self, state_id: StateId) {
        self.log.lock().unwrap().finalized.push(state_id);
    }

    fn post_run(&mut self, _context: &Context) {
        self.log.lock().unwrap().post_run = true;
    }
}

/// Counts invocations per package name and vetoes listed tuples.
#[derive(Default)]
struct CountingStep {
    calls: Arc<Mutex<HashMap<String, usize>>>,
    veto: Vec<String>,
    multi: bool,
}

impl Unit for CountingStep {}

impl Step for CountingStep {
    fn multi_package_resolutions(&self) -> bool {
        self.multi
    }

    fn run(
        &mut self,
        _context: &Context,
        _state: &State,
        package_version: &PackageVersion,
    ) -> UnitResult<Option<StepResult>> {
        *self.calls.lock().unwrap().entry(package_version.name.clone()).or_default() += 1;
        if self.veto.contains(&package_version.to_tuple().to_string()) {
            return Ok(Verdict::reject("vetoed"));
        }
        Ok(Verdict::Accept(None))
    }
}

struct ScoreStep(f64);

impl Unit for ScoreStep {}

impl Step for ScoreStep {
    fn run(
        &mut self,
        _context: &Context,
        _state: &State,
        _package_version: &PackageVersion,
    ) -> UnitResult<Option<StepResult>> {
        Ok(Verdict::Accept(Some(StepResult::score(self.0))))
    }
}

/// Multi-package step rejecting the second scoring of one package name.
struct VetoSecondCall {
    name: String,
    seen: usize,
}

impl Unit for VetoSecondCall {}

impl Step for VetoSecondCall {
    fn multi_package_resolutions(&self) -> bool {
        true
    }

    fn run(
        &mut self,
        _context: &Context,
        _state: &State,
        package_version: &PackageVersion,
    ) -> UnitResult<Option<StepResult>> {
        if package_version.name != self.name {
            return Ok(Verdict::Accept(None));
        }
        self.seen += 1;
        if self.seen > 1 {
            return Ok(Verdict::reject("already scored"));
        }
        Ok(Verdict::Accept(None))
    }
}

/// Accepts `accepted` final states, then asks to stop.
struct StopAfterStride {
    accepted: usize,
}

impl Unit for StopAfterStride {}

impl Stride for StopAfterStride {
    fn run(&mut self, _context: &Context, _state: &State) -> UnitResult<()> {
        if self.accepted == 0 {
            return Ok(Verdict::stop("enough stacks"));
        }
        self.accepted -= 1;
        Ok(Verdict::Accept(()))
    }
}

struct RefusingBoot;

impl Unit for RefusingBoot {}

impl Boot for RefusingBoot {
    fn run(&mut self, _context: &mut Context) -> UnitResult<()> {
        Ok(Verdict::reject("unsupported environment"))
    }
}

struct FailingBoot;

impl Unit for FailingBoot {}

impl Boot for FailingBoot {
    fn run(&mut self, _context: &mut Context) -> UnitResult<()> {
        Err(anyhow!("boom"))
    }
}

struct FailingSieve;

impl Unit for FailingSieve {}

impl Sieve for FailingSieve {
    fn run(
        &mut self,
        _context: &Context,
        _package_versions: Vec<PackageVersion>,
    ) -> UnitResult<Vec<PackageVersion>> {
        Err(anyhow!("sieve exploded"))
    }
}

/// Offers `intel-tensorflow` wherever `tensorflow` is a candidate.
struct IntelTensorflow;

impl Unit for IntelTensorflow {}

impl Pseudonym for IntelTensorflow {
    fn run(
        &mut self,
        _context: &Context,
        package_version: &PackageVersion,
    ) -> anyhow::Result<Vec<PackageTuple>> {
        if package_version.name != "tensorflow" {
            return Ok(Vec::new());
        }
        Ok(vec![PackageTuple::new(
            "intel-tensorflow",
            package_version.version.clone(),
            package_version.index_url.clone(),
        )])
    }
}

fn project(requirements: &[(&str, &str)]) -> Project {
    let mut project = Project::default();
    for (name, specifier) in requirements {
        project.require(Requirement::new(name, specifier).unwrap());
    }
    project
}

fn build_resolver(
    graph: MemoryGraph,
    project: Project,
    config: ResolverConfig,
    pipeline: Pipeline,
) -> (Resolver, Arc<Mutex<Log>>) {
    resolver_preferring(graph, project, config, pipeline, &[])
}

fn resolver_preferring(
    graph: MemoryGraph,
    project: Project,
    config: ResolverConfig,
    pipeline: Pipeline,
    prefer: &[&str],
) -> (Resolver, Arc<Mutex<Log>>) {
    let (predictor, log) = RecordingPredictor::new(prefer);
    let resolver = Resolver::new(Arc::new(graph), project, config)
        .with_pipeline(pipeline)
        .with_predictor(Box::new(predictor));
    (resolver, log)
}

fn versions_of(report: &Report, name: &str) -> Vec<String> {
    report
        .products
        .iter()
        .map(|p| p.get(name).map(|p| p.version.clone()).unwrap_or_default())
        .collect()
}

fn six_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    graph.add_package("six", "1.0.0", INDEX);
    graph.add_package("six", "0.1.0", INDEX);
    graph.add_package("six", "3.0.0", INDEX);
    graph
}

#[test]
fn test_simple_linear_resolve() {
    let mut graph = MemoryGraph::new();
    graph.add_package("pkg-a", "1.0.0", INDEX);

    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("pkg-a", "==1.0.0")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(report.products.len(), 1);
    let product = &report.products[0];
    assert_eq!(product.score, 0.0);
    assert_eq!(product.packages.len(), 1);
    assert_eq!(product.packages[0].name, "pkg-a");
    assert_eq!(product.packages[0].version, "1.0.0");
    assert_eq!(product.packages[0].index_url, INDEX);
    assert_eq!(report.accepted_final_states, 1);

    let log = log.lock().unwrap();
    assert!(log.pre_run && log.post_run);
    assert_eq!(log.rewards.len(), 1);
    assert_eq!(log.rewards[0].1, f64::INFINITY);
}

#[test]
fn test_transitive_dependencies_latest_first() {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX).depends_on("b", ">=1.0");
    graph.add_package("b", "1.0.0", INDEX);
    graph.add_package("b", "2.0.0", INDEX);

    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("a", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "b"), vec!["2.0.0", "1.0.0"]);
    assert_eq!(versions_of(&report, "a"), vec!["1.0.0", "1.0.0"]);

    // Every state that left the search was finalized exactly once
    let log = log.lock().unwrap();
    let mut finalized = log.finalized.clone();
    finalized.sort();
    finalized.dedup();
    assert_eq!(finalized.len(), log.finalized.len());
    assert_eq!(finalized.len(), 2);
}

#[test]
fn test_unresolved_direct_dependencies() {
    let mut graph = MemoryGraph::new();
    graph.add_package("pkg-a", "1.0.0", INDEX);

    let project = project(&[("phantom", "*"), ("pkg-a", "*"), ("ghost", ">=1")]);
    let (mut resolver, _) = build_resolver(
        graph,
        project,
        ResolverConfig::default(),
        Pipeline::default(),
    );

    match resolver.resolve() {
        Err(ResolverError::UnresolvedDependencies(names)) => {
            assert_eq!(names, vec!["ghost", "phantom"])
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.products.len())),
    }
}

#[test]
fn test_direct_dependency_filtered_by_specifier() {
    let mut graph = MemoryGraph::new();
    graph.add_package("pkg-a", "1.0.0", INDEX);

    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("pkg-a", ">=2")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    assert!(matches!(
        resolver.resolve(),
        Err(ResolverError::UnresolvedDependencies(names)) if names == vec!["pkg-a"]
    ));
}

#[test]
fn test_single_candidate_dependencies_resolve() {
    let mut graph = MemoryGraph::new();
    graph.add_package("pkg-a", "1.0.0", INDEX);
    graph.add_package("pkg-b", "1.0.0", INDEX);

    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("pkg-a", "*"), ("pkg-b", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();
    assert_eq!(report.products[0].packages.len(), 2);
}

#[test]
fn test_version_ordering() {
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();
    assert_eq!(versions_of(&report, "six"), vec!["3.0.0", "1.0.0", "0.1.0"]);
}

#[test]
fn test_limit_latest_versions() {
    let config = ResolverConfig {
        limit_latest_versions: Some(2),
        ..ResolverConfig::default()
    };
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        config,
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();
    assert_eq!(versions_of(&report, "six"), vec!["3.0.0", "1.0.0"]);
}

#[test]
fn test_limit_terminates_search() {
    let config = ResolverConfig {
        limit: 1,
        ..ResolverConfig::default()
    };
    let (mut resolver, log) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        config,
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(report.products.len(), 1);
    assert_eq!(report.accepted_final_states, 1);
    assert_eq!(report.iterations, 1);
    // The sibling still holding 1.0.0 and 0.1.0 is finalized at the end
    assert_eq!(log.lock().unwrap().finalized.len(), 2);
}

#[test]
fn test_conflicting_shared_dependency() {
    let mut graph = MemoryGraph::new();
    for version in ["0.6.0", "0.7.0", "0.8.0", "0.9.0"] {
        graph.add_package("absl-py", version, INDEX);
    }
    graph.add_package("tensorflow", "2.0.0", INDEX).depends_on("absl-py", ">=0.8.0");

    let project = project(&[("absl-py", "<0.8.0"), ("tensorflow", "*")]);
    let (mut resolver, log) = resolver_preferring(
        graph,
        project,
        ResolverConfig::default(),
        Pipeline::default(),
        &["tensorflow"],
    );

    let mut products = resolver.resolve_products().unwrap();
    assert!(products.next().is_none());
    assert_eq!(products.context().iteration, 1);
    assert!(products.context().beam.is_empty());
    drop(products);

    let log = log.lock().unwrap();
    assert_eq!(log.rewards.len(), 1);
    assert_eq!(log.nan_rewards(), vec![format!("tensorflow==2.0.0@{}", INDEX)]);
    assert_eq!(log.finalized.len(), 1);
}

#[test]
fn test_conflict_with_resolved_version() {
    let mut graph = MemoryGraph::new();
    graph.add_package("absl-py", "0.7.0", INDEX);
    graph.add_package("absl-py", "0.9.0", INDEX);
    graph.add_package("tensorflow", "2.0.0", INDEX).depends_on("absl-py", ">=0.8.0");
    graph.add_package("tensorflow", "1.0.0", INDEX).depends_on("absl-py", "<0.8.0");

    let project = project(&[("absl-py", "<0.8.0"), ("tensorflow", "*")]);
    let (mut resolver, log) = build_resolver(
        graph,
        project,
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(report.products.len(), 1);
    assert_eq!(versions_of(&report, "tensorflow"), vec!["1.0.0"]);
    assert_eq!(versions_of(&report, "absl-py"), vec!["0.7.0"]);
    assert_eq!(log.lock().unwrap().nan_rewards(), vec![format!("tensorflow==2.0.0@{}", INDEX)]);
}

#[test]
fn test_multi_package_resolution_guard() {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX).depends_on("c", "*");
    graph.add_package("b", "1.0.0", INDEX).depends_on("c", "*");
    graph.add_package("c", "1.0.0", INDEX);

    let step = CountingStep::default();
    let calls = Arc::clone(&step.calls);
    let pipeline = Pipeline::builder().step(step).build();

    let (mut resolver, _) = resolver_preferring(
        graph,
        project(&[("a", "*"), ("b", "*")]),
        ResolverConfig::default(),
        pipeline,
        &["a", "c", "b"],
    );

    let mut products = resolver.resolve_products().unwrap();
    let product = products.next().unwrap().unwrap();
    assert!(products.next().is_none());

    let c = PackageTuple::new("c", "1.0.0", INDEX);
    let dependents: Vec<String> =
        products.context().dependents_of(&c).map(|t| t.name.clone()).collect();
    assert_eq!(dependents, vec!["a", "b"]);
    drop(products);

    assert_eq!(product.packages.len(), 3);
    let calls = calls.lock().unwrap();
    assert_eq!(calls["a"], 1);
    assert_eq!(calls["b"], 1);
    assert_eq!(calls["c"], 1);
}

fn shared_dependency_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX).depends_on("c", "*");
    graph.add_package("b", "1.0.0", INDEX).depends_on("c", "*");
    graph.add_package("c", "1.0.0", INDEX);
    graph
}

#[test]
fn test_multi_package_steps_score_confirmed_dependencies() {
    let multi = CountingStep {
        multi: true,
        ..CountingStep::default()
    };
    let multi_calls = Arc::clone(&multi.calls);
    let single = CountingStep::default();
    let single_calls = Arc::clone(&single.calls);
    let pipeline = Pipeline::builder().step(multi).step(single).build();

    let (mut resolver, _) = resolver_preferring(
        shared_dependency_graph(),
        project(&[("a", "*"), ("b", "*")]),
        ResolverConfig::default(),
        pipeline,
        &["a", "c", "b"],
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].packages.len(), 3);
    assert_eq!(versions_of(&report, "c"), vec!["1.0.0"]);

    let multi_calls = multi_calls.lock().unwrap();
    assert_eq!(multi_calls["a"], 1);
    assert_eq!(multi_calls["b"], 1);
    assert_eq!(multi_calls["c"], 2);

    let single_calls = single_calls.lock().unwrap();
    assert_eq!(single_calls["c"], 1);
}

#[test]
fn test_multi_package_step_veto_on_confirmation() {
    let mut graph = shared_dependency_graph();
    graph.add_package("b", "0.9.0", INDEX);

    // c is accepted when first resolved, then vetoed when b==1.0.0 depends on it again
    let step = CountingStep {
        multi: true,
        ..CountingStep::default()
    };
    let calls = Arc::clone(&step.calls);
    let pipeline = Pipeline::builder()
        .step(VetoSecondCall {
            name: "c".to_string(),
            seen: 0,
        })
        .step(step)
        .build();

    let (mut resolver, log) = resolver_preferring(
        graph,
        project(&[("a", "*"), ("b", "*")]),
        ResolverConfig::default(),
        pipeline,
        &["a", "c", "b"],
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "b"), vec!["0.9.0"]);
    assert_eq!(log.lock().unwrap().nan_rewards(), vec![format!("b==1.0.0@{}", INDEX)]);
    assert_eq!(calls.lock().unwrap()["c"], 1);
}

#[test]
fn test_step_veto_rejects_expansion() {
    let mut graph = MemoryGraph::new();
    graph.add_package("six", "2.0.0", INDEX);
    graph.add_package("six", "1.0.0", INDEX);

    let step = CountingStep {
        veto: vec![format!("six==2.0.0@{}", INDEX)],
        ..CountingStep::default()
    };
    let pipeline = Pipeline::builder().step(step).build();
    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("six", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "six"), vec!["1.0.0"]);
    let log = log.lock().unwrap();
    assert_eq!(log.nan_rewards(), vec![format!("six==2.0.0@{}", INDEX)]);
    assert_eq!(log.rewards.len(), 2);
}

#[test]
fn test_step_veto_of_only_candidate() {
    let mut graph = MemoryGraph::new();
    graph.add_package("six", "1.0.0", INDEX);

    let step = CountingStep {
        veto: vec![format!("six==1.0.0@{}", INDEX)],
        ..CountingStep::default()
    };
    let pipeline = Pipeline::builder().step(step).build();
    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("six", "*")]),
        ResolverConfig::default(),
        pipeline,
    );

    assert!(matches!(resolver.resolve(), Err(ResolverError::CannotProduceStack(_))));
    let log = log.lock().unwrap();
    assert_eq!(log.rewards.len(), 1);
    assert!(log.rewards[0].1.is_nan());
}

#[test]
fn test_step_scores_accumulate() {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX).depends_on("b", "*");
    graph.add_package("b", "1.0.0", INDEX);

    let pipeline = Pipeline::builder().step(ScoreStep(0.5)).build();
    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("a", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(report.products[0].score, 1.0);
    let log = log.lock().unwrap();
    assert_eq!(log.rewards[0].1, 0.5);
    assert_eq!(log.rewards[1].1, f64::INFINITY);
}

#[test]
fn test_non_finite_step_score_is_fatal() {
    let mut graph = MemoryGraph::new();
    graph.add_package("six", "1.0.0", INDEX);

    let pipeline = Pipeline::builder().step(ScoreStep(f64::NAN)).build();
    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("six", "*")]),
        ResolverConfig::default(),
        pipeline,
    );

    match resolver.resolve() {
        Err(ResolverError::Step { unit, package, .. }) => {
            assert_eq!(unit, "ScoreStep");
            assert_eq!(package, format!("six==1.0.0@{}", INDEX));
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.products.len())),
    }
}

#[test]
fn test_score_threshold_discards_final_states() {
    let pipeline = Pipeline::builder()
        .step(VersionPenalizationStep::default())
        .stride(ScoreThresholdStride::new(-0.06))
        .build();
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "six"), vec!["3.0.0", "1.0.0"]);
    assert_eq!(report.accepted_final_states, 2);
    assert_eq!(report.discarded_final_states, 1);
    assert!(report.products[1].score < 0.0);
}

#[test]
fn test_stop_pipeline_keeps_accepted_products() {
    let pipeline = Pipeline::builder().stride(StopAfterStride { accepted: 1 }).build();
    let (mut resolver, log) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "six"), vec!["3.0.0"]);
    assert_eq!(report.iterations, 2);
    assert!(log.lock().unwrap().post_run);
}

#[test]
fn test_stop_handle() {
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    resolver.stop_handle().stop();

    let mut products = resolver.resolve_products().unwrap();
    assert!(products.next().is_none());
    assert_eq!(products.context().iteration, 0);
}

#[test]
fn test_skip_package_sieve() {
    let mut graph = MemoryGraph::new();
    graph
        .add_package("a", "1.0.0", INDEX)
        .depends_on("enum34", "*")
        .depends_on("b", "*");
    graph.add_package("b", "1.0.0", INDEX);
    graph.add_package("enum34", "1.1.10", INDEX);

    let pipeline = Pipeline::builder()
        .sieve(SkipPackageSieve::new(["enum34".to_string()]))
        .build();
    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("a", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    let product = &report.products[0];
    assert!(product.get("enum34").is_none());
    assert!(product.get("b").is_some());
    assert_eq!(report.skipped_packages, vec!["enum34"]);
    assert!(report
        .stack_info
        .iter()
        .any(|info| info.package_name.as_deref() == Some("enum34")));
}

#[test]
fn test_skipped_direct_dependency() {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX);
    graph.add_package("enum34", "1.1.10", INDEX);

    let pipeline = Pipeline::builder()
        .sieve(SkipPackageSieve::new(["enum34".to_string()]))
        .build();
    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("a", "*"), ("enum34", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();
    assert_eq!(report.products[0].packages.len(), 1);
    assert_eq!(resolver.stack_info().len(), 1);
}

#[test]
fn test_pseudonyms_join_group() {
    let mut graph = MemoryGraph::new();
    graph.add_package("tensorflow", "2.0.0", INDEX);
    graph.add_package("intel-tensorflow", "2.0.0", INDEX);

    let pipeline = Pipeline::builder().pseudonym(IntelTensorflow).build();
    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("tensorflow", "*")]),
        ResolverConfig::default(),
        pipeline,
    );
    let report = resolver.resolve().unwrap();

    let names: Vec<&str> = report.products.iter().map(|p| p.packages[0].name.as_str()).collect();
    assert_eq!(names, vec!["tensorflow", "intel-tensorflow"]);
}

#[test]
fn test_unsolved_dependency_is_rejected() {
    let mut graph = MemoryGraph::new();
    graph.add_package("a", "1.0.0", INDEX).depends_on("b", "*");
    graph.add_package("b", "2.0.0", INDEX).unsolved();
    graph.add_package("b", "1.0.0", INDEX);

    let (mut resolver, log) = build_resolver(
        graph,
        project(&[("a", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    assert_eq!(versions_of(&report, "b"), vec!["1.0.0"]);
    assert_eq!(log.lock().unwrap().nan_rewards(), vec![format!("b==2.0.0@{}", INDEX)]);
}

#[test]
fn test_environment_markers() {
    let mut graph = MemoryGraph::new();
    graph
        .add_package("a", "1.0.0", INDEX)
        .add_edge(DependencyEdge::new("pywin32", "*").with_marker("sys_platform == 'win32'", false))
        .add_edge(DependencyEdge::new("b", "*").with_marker("python_version >= '3.6'", true));
    graph.add_package("pywin32", "228", INDEX);
    graph.add_package("b", "1.0.0", INDEX);

    let mut project = project(&[("a", "*")]);
    project.runtime_environment = RuntimeEnvironment::new(Some("fedora"), Some("32"), Some("3.8"));

    let (mut resolver, _) = build_resolver(
        graph,
        project,
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();

    let product = &report.products[0];
    assert!(product.get("pywin32").is_none());
    assert_eq!(
        product.get("b").and_then(|b| b.markers.as_deref()),
        Some("python_version >= '3.6'")
    );
}

#[test]
fn test_partial_environment_ignores_markers() {
    let mut graph = MemoryGraph::new();
    graph
        .add_package("a", "1.0.0", INDEX)
        .add_edge(
            DependencyEdge::new("pywin32", "*").with_marker("sys_platform == 'win32'", false),
        );
    graph.add_package("pywin32", "228", INDEX);

    let (mut resolver, _) = build_resolver(
        graph,
        project(&[("a", "*")]),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    let report = resolver.resolve().unwrap();
    assert!(report.products[0].get("pywin32").is_some());
}

#[test]
fn test_boot_refusal() {
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        Pipeline::builder().boot(RefusingBoot).build(),
    );
    assert!(matches!(resolver.resolve(), Err(ResolverError::CannotProduceStack(_))));
}

#[test]
fn test_unit_failures_are_wrapped() {
    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        Pipeline::builder().boot(FailingBoot).build(),
    );
    match resolver.resolve() {
        Err(ResolverError::Boot { unit, message }) => {
            assert_eq!(unit, "FailingBoot");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.products.len())),
    }

    let (mut resolver, _) = build_resolver(
        six_graph(),
        project(&[("six", "*")]),
        ResolverConfig::default(),
        Pipeline::builder().sieve(FailingSieve).build(),
    );
    assert!(matches!(
        resolver.resolve(),
        Err(ResolverError::Sieve { unit, package, .. })
            if unit == "FailingSieve" && package == "six"
    ));
}

#[test]
fn test_empty_project() {
    let (mut resolver, _) = build_resolver(
        six_graph(),
        Project::default(),
        ResolverConfig::default(),
        Pipeline::default(),
    );
    assert!(matches!(resolver.resolve(), Err(ResolverError::CannotProduceStack(_))));
}

#[test]
fn test_builtin_predictors_resolve() {
    for kind in ["approximating-latest", "hill-climbing", "random-walk", "sampling"] {
        let mut graph = MemoryGraph::new();
        graph.add_package("a", "1.0.0", INDEX).depends_on("b", "*");
        graph.add_package("b", "1.0.0", INDEX);
        graph.add_package("b", "2.0.0", INDEX);

        let config = ResolverConfig {
            predictor: kind.parse().unwrap(),
            seed: Some(42),
            ..ResolverConfig::default()
        };
        let mut resolver = Resolver::new(Arc::new(graph), project(&[("a", "*")]), config);
        let report = resolver.resolve().unwrap();

        let mut versions = versions_of(&report, "b");
        versions.sort();
        assert_eq!(versions, vec!["1.0.0", "2.0.0"], "predictor {}", kind);
    }
}
