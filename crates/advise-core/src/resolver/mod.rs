//! The beam-search resolution loop.
//!
//! A run boots the pipeline, seeds the beam with one state holding every
//! direct dependency, then repeatedly lets the predictor pick a state and a
//! pending package to expand until the beam is exhausted, the final-state
//! limit is reached or a stop is requested. Final states that pass the
//! strides are wrapped and yielded as products.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use advise_version::SpecifierSet;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::graph::{GraphDatabase, GraphError};
use crate::package::{
    normalize_name, sort_latest_first, Justification, PackageTuple, PackageVersion, StackInfo,
};
use crate::pipeline::{Pipeline, Verdict};
use crate::predictor::Predictor;
use crate::product::{Product, Report};
use crate::project::Project;
use crate::state::State;

/// Cooperative cancellation flag, checked once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolves the direct dependencies of a project into ranked stacks.
pub struct Resolver {
    graph: Arc<dyn GraphDatabase + Sync>,
    project: Project,
    config: ResolverConfig,
    pipeline: Pipeline,
    predictor: Box<dyn Predictor>,
    stop: StopHandle,
    stack_info: Vec<StackInfo>,
}

impl Resolver {
    /// Resolver with the built-in pipeline and predictor selected by `config`.
    pub fn new(
        graph: Arc<dyn GraphDatabase + Sync>,
        project: Project,
        config: ResolverConfig,
    ) -> Self {
        let pipeline = Pipeline::from_config(&config);
        let predictor = config.predictor.build(config.seed);
        Self {
            graph,
            project,
            config,
            pipeline,
            predictor,
            stop: StopHandle::new(),
            stack_info: Vec::new(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_predictor(mut self, predictor: Box<dyn Predictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stack info of the last run, available even when it failed.
    pub fn stack_info(&self) -> &[StackInfo] {
        &self.stack_info
    }

    /// Start a run and return the products as they are found.
    pub fn resolve_products(&mut self) -> Result<Products<'_>> {
        self.stack_info.clear();
        let context = Context::new(self.project.clone(), Arc::clone(&self.graph), &self.config)?;

        let mut products = Products {
            pipeline: &mut self.pipeline,
            predictor: &mut self.predictor,
            config: &self.config,
            stop: self.stop.clone(),
            stack_info: &mut self.stack_info,
            context,
            started: false,
            stopped: false,
            finished: false,
        };
        products.start()?;
        Ok(products)
    }

    /// Run to completion and report the best `count` products.
    pub fn resolve(&mut self) -> Result<Report> {
        let mut report = Report::new(self.config.count);

        let mut products = self.resolve_products()?;
        for product in &mut products {
            report.add_product(product?);
        }
        products.finish();
        report.record_run(products.context());
        drop(products);

        self.predictor.post_run_report(&mut report);

        if report.is_empty() {
            return Err(ResolverError::CannotProduceStack(format!(
                "no final state was accepted after {} iterations",
                report.iterations
            )));
        }
        Ok(report)
    }
}

enum Expansion {
    /// The expanded state became final
    Final(State),
    Continue,
    /// A unit asked to end the run
    Stop,
}

/// Result of running the steps on one package version.
enum StepOutcome {
    Scored {
        score: f64,
        justification: Vec<Justification>,
    },
    Vetoed,
    Stop,
}

/// Products of one run, yielded in the order final states are accepted.
///
/// Dropping the iterator ends the run; remaining states are finalized and
/// post-run hooks are called.
pub struct Products<'a> {
    pipeline: &'a mut Pipeline,
    predictor: &'a mut Box<dyn Predictor>,
    config: &'a ResolverConfig,
    stop: StopHandle,
    stack_info: &'a mut Vec<StackInfo>,
    context: Context,
    started: bool,
    stopped: bool,
    finished: bool,
}

impl Products<'_> {
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// End the run. Idempotent.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        for state in self.context.beam.drain() {
            self.predictor.finalize_state(state.id());
        }
        if self.started {
            self.predictor.post_run(&self.context);
        }
        self.pipeline.post_run(&self.context);
        *self.stack_info = self.context.stack_info().to_vec();

        info!(
            "Resolution finished after {} iterations: {} accepted and {} discarded final states",
            self.context.iteration,
            self.context.accepted_final_states_count,
            self.context.discarded_final_states_count
        );
    }

    fn start(&mut self) -> Result<()> {
        info!(
            "Resolving with predictor {} and pipeline {}",
            self.predictor.name(),
            self.pipeline.describe()
        );
        self.pipeline.pre_run(&self.context);

        self.run_boots()?;
        if self.stopped {
            return Ok(());
        }

        self.prepare_initial_state()?;
        if self.stopped {
            return Ok(());
        }

        self.predictor.pre_run(&self.context);
        self.started = true;
        Ok(())
    }

    fn run_boots(&mut self) -> Result<()> {
        for boot in self.pipeline.boots.iter_mut() {
            match boot.run(&mut self.context) {
                Ok(Verdict::Accept(())) => {}
                Ok(Verdict::Reject(reason)) | Ok(Verdict::SkipPackage(reason)) => {
                    return Err(ResolverError::CannotProduceStack(format!(
                        "boot {} refused the run: {}",
                        boot.name(),
                        reason
                    )));
                }
                Ok(Verdict::StopPipeline(reason)) => {
                    info!("Boot {} stopped the resolution: {}", boot.name(), reason);
                    self.stopped = true;
                    return Ok(());
                }
                Err(err) => {
                    return Err(ResolverError::Boot {
                        unit: boot.name().to_string(),
                        message: format!("{:#}", err),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve direct dependencies and seed the beam with the initial state.
    fn prepare_initial_state(&mut self) -> Result<()> {
        let environment = self.context.runtime_environment().clone();
        let requirements: Vec<_> = self
            .context
            .project
            .direct_dependencies(self.config.with_devel)
            .into_iter()
            .cloned()
            .collect();

        if requirements.is_empty() {
            return Err(ResolverError::CannotProduceStack(
                "the project declares no direct dependencies".to_string(),
            ));
        }

        let mut resolved = Vec::with_capacity(requirements.len());
        let mut unresolved = Vec::new();
        for requirement in requirements {
            let result = self
                .context
                .graph()
                .get_solved_python_package_versions_all(&requirement.name, &environment);
            let mut tuples = not_found_as_empty(result)?;
            tuples.retain(|t| {
                requirement.specifier.contains_str(&t.version)
                    && requirement.index_url.as_ref().map_or(true, |index| *index == t.index_url)
            });

            if tuples.is_empty() {
                warn!(
                    "No solved versions of direct dependency {} match {}",
                    requirement.name, requirement.specifier
                );
                unresolved.push(requirement.name.clone());
            }
            resolved.push((requirement, tuples));
        }

        if !unresolved.is_empty() {
            return Err(ResolverError::UnresolvedDependencies(unresolved));
        }

        let mut state = State::new(0.0, 0);
        for (requirement, tuples) in resolved {
            for tuple in &tuples {
                self.context.register_package_tuple(
                    tuple,
                    None,
                    requirement.develop,
                    &requirement.extras,
                    None,
                );
            }

            let verdict = build_group(
                self.pipeline,
                &mut self.context,
                &requirement.name,
                tuples,
                None,
                requirement.develop,
            )?;
            match verdict {
                Verdict::Accept(group) if group.is_empty() => {
                    return Err(ResolverError::CannotProduceStack(format!(
                        "no candidates of direct dependency {} passed the sieves",
                        requirement.name
                    )));
                }
                Verdict::Accept(group) => {
                    debug!("Direct dependency {} has {} candidates", requirement.name, group.len());
                    for tuple in group {
                        state.add_unresolved_dependency_to(&requirement.name, tuple)?;
                    }
                }
                Verdict::Reject(reason) => {
                    return Err(ResolverError::CannotProduceStack(format!(
                        "direct dependency {} was rejected: {}",
                        requirement.name, reason
                    )));
                }
                Verdict::SkipPackage(reason) => {
                    skip_package(&mut self.context, &requirement.name, &reason)
                }
                Verdict::StopPipeline(reason) => {
                    info!("Resolution stopped while preparing the initial state: {}", reason);
                    self.stopped = true;
                    return Ok(());
                }
            }
        }

        if state.is_final() {
            return Err(ResolverError::CannotProduceStack(
                "every direct dependency was removed from the resolution".to_string(),
            ));
        }

        self.context.beam.wipe();
        self.push_state(state);
        Ok(())
    }

    fn push_state(&mut self, state: State) {
        if let Some(evicted) = self.context.beam.add_state(state) {
            debug!("State {} dropped from the beam", evicted.id());
            self.predictor.finalize_state(evicted.id());
        }
    }

    /// Run the loop until the next accepted final state.
    fn next_final_state(&mut self) -> Result<Option<State>> {
        loop {
            if !self.started || self.stopped {
                return Ok(None);
            }
            if self.stop.is_stopped() {
                info!("Resolution stopped on request");
                return Ok(None);
            }
            if self.context.limit_reached() {
                info!("Reached the limit of {} final states", self.context.limit);
                return Ok(None);
            }
            if self.context.beam.is_empty() {
                info!("No more states to expand");
                return Ok(None);
            }

            self.context.beam.new_iteration();
            self.context.iteration += 1;

            let (state_id, tuple) = self.predictor.run(&self.context)?;
            let state = self.context.beam.remove(state_id).ok_or_else(|| {
                ResolverError::Internal(format!(
                    "predictor {} chose state {} which is not in the beam",
                    self.predictor.name(),
                    state_id
                ))
            })?;
            if !state.is_unresolved(&tuple) {
                return Err(ResolverError::Internal(format!(
                    "predictor {} chose {} which is not unresolved in state {}",
                    self.predictor.name(),
                    tuple,
                    state_id
                )));
            }

            debug!(
                "Iteration {}: expanding {} in state {}",
                self.context.iteration, tuple, state_id
            );
            match self.expand_state(state, &tuple)? {
                Expansion::Continue => {}
                Expansion::Stop => return Ok(None),
                Expansion::Final(state) => {
                    if let Some(state) = self.accept_final_state(state)? {
                        return Ok(Some(state));
                    }
                }
            }
        }
    }

    fn expand_state(&mut self, mut state: State, tuple: &PackageTuple) -> Result<Expansion> {
        let package_version = self
            .context
            .get_package_version(tuple, false)?
            .cloned()
            .ok_or_else(|| {
                ResolverError::Internal(format!("package {} was never registered", tuple))
            })?;
        let group = state
            .unresolved_group_of(tuple)
            .map(str::to_string)
            .ok_or_else(|| {
                ResolverError::Internal(format!(
                    "{} is not unresolved in state {}",
                    tuple,
                    state.id()
                ))
            })?;
        state.remove_unresolved_dependency(tuple);

        let environment = self.context.runtime_environment().clone();
        let fully_specified = environment.is_fully_specified();

        let mut extras = vec![None];
        extras.extend(package_version.extras.iter().cloned().map(Some));

        let result = self.context.graph().get_depends_on(
            tuple,
            &environment,
            &extras,
            fully_specified.then_some(true),
        );
        let dependencies = match result {
            Ok(dependencies) => dependencies,
            Err(err) if err.is_not_found() => {
                if self.context.first_rejection(tuple) {
                    warn!("Dependencies of {} are not known yet: {}", tuple, err);
                }
                self.reject_expansion(state, &group, tuple);
                return Ok(Expansion::Continue);
            }
            Err(err) => return Err(err.into()),
        };

        // Candidates per dependency name, in discovery order
        let mut discovered: IndexMap<String, Vec<PackageTuple>> = IndexMap::new();
        // Resolved packages this expansion depends on again
        let mut confirmed: Vec<PackageTuple> = Vec::new();
        for (dependency_name, specifier) in dependencies.values().flatten() {
            let name = normalize_name(dependency_name);
            if self.context.is_skipped(&name) {
                debug!("Ignoring dependency {} of {}: removed from resolution", name, tuple);
                continue;
            }

            let specifier_set = SpecifierSet::parse(specifier)?;
            let result = self
                .context
                .graph()
                .get_python_package_version_records(&name, None, None, &environment);
            let mut candidates: Vec<PackageTuple> = Vec::new();
            for record in not_found_as_empty(result)? {
                let candidate = record.to_tuple();
                if specifier_set.contains_str(&candidate.version)
                    && !candidates.contains(&candidate)
                {
                    candidates.push(candidate);
                }
            }

            if let Some(resolved) = state.resolved_dependencies().get(&name).cloned() {
                if candidates.iter().any(|c| c.same_release(&resolved)) {
                    self.context.register_package_tuple(
                        &resolved,
                        Some(tuple),
                        package_version.develop,
                        &[],
                        None,
                    );
                    if !confirmed.contains(&resolved) {
                        confirmed.push(resolved);
                    }
                    continue;
                }
                debug!(
                    "{} requires {}{} which conflicts with {} in state {}",
                    tuple,
                    name,
                    specifier,
                    resolved,
                    state.id()
                );
                self.reject_expansion(state, &group, tuple);
                return Ok(Expansion::Continue);
            }

            if candidates.is_empty() {
                debug!("No versions of {} match {} required by {}", name, specifier, tuple);
                self.reject_expansion(state, &group, tuple);
                return Ok(Expansion::Continue);
            }

            let markers = if fully_specified {
                let result = self
                    .context
                    .graph()
                    .get_python_environment_marker(tuple, &name, specifier, &environment);
                match result {
                    Ok(markers) => markers,
                    Err(err) if err.is_not_found() => None,
                    Err(err) => return Err(err.into()),
                }
            } else {
                None
            };

            for candidate in &candidates {
                self.context.register_package_tuple(
                    candidate,
                    Some(tuple),
                    package_version.develop,
                    &[],
                    markers.clone(),
                );
            }

            match discovered.entry(name) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().retain(|c| candidates.contains(c));
                    if entry.get().is_empty() {
                        debug!("Requirements of {} on {} exclude each other", tuple, entry.key());
                        self.reject_expansion(state, &group, tuple);
                        return Ok(Expansion::Continue);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(candidates);
                }
            }
        }

        let mut new_groups: IndexMap<String, Vec<PackageTuple>> = IndexMap::new();
        for (name, candidates) in discovered {
            if let Some(pending) = state.unresolved_dependencies().get(&name) {
                let mut common: Vec<PackageTuple> =
                    candidates.into_iter().filter(|c| pending.contains(c)).collect();
                if common.is_empty() {
                    debug!(
                        "Candidates of {} required by {} do not overlap with pending ones \
                         in state {}",
                        name,
                        tuple,
                        state.id()
                    );
                    self.reject_expansion(state, &group, tuple);
                    return Ok(Expansion::Continue);
                }
                sort_latest_first(&mut common);
                new_groups.insert(name, common);
                continue;
            }

            let verdict = build_group(
                self.pipeline,
                &mut self.context,
                &name,
                candidates,
                Some(tuple),
                package_version.develop,
            )?;
            match verdict {
                Verdict::Accept(candidates) if candidates.is_empty() => {
                    debug!("Sieves removed every candidate of {} required by {}", name, tuple);
                    self.reject_expansion(state, &group, tuple);
                    return Ok(Expansion::Continue);
                }
                Verdict::Accept(candidates) => {
                    new_groups.insert(name, candidates);
                }
                Verdict::Reject(reason) => {
                    debug!("Candidates of {} required by {} rejected: {}", name, tuple, reason);
                    self.reject_expansion(state, &group, tuple);
                    return Ok(Expansion::Continue);
                }
                Verdict::SkipPackage(reason) => skip_package(&mut self.context, &name, &reason),
                Verdict::StopPipeline(reason) => {
                    info!("Resolution stopped while expanding {}: {}", tuple, reason);
                    return Ok(self.stop_with(state));
                }
            }
        }

        self.run_steps(state, &group, tuple, &package_version, &confirmed, new_groups)
    }

    /// Score the resolution of `tuple` and fold its dependencies into a
    /// child state. Each package in `confirmed` is already resolved in
    /// `state` and is scored again by multi-package steps only.
    fn run_steps(
        &mut self,
        state: State,
        group: &str,
        tuple: &PackageTuple,
        package_version: &PackageVersion,
        confirmed: &[PackageTuple],
        new_groups: IndexMap<String, Vec<PackageTuple>>,
    ) -> Result<Expansion> {
        let mut scored = vec![(package_version.clone(), state.is_resolved(&tuple.name))];
        for resolved in confirmed {
            let resolved_version = self
                .context
                .get_package_version(resolved, false)?
                .cloned()
                .ok_or_else(|| {
                    ResolverError::Internal(format!("package {} was never registered", resolved))
                })?;
            scored.push((resolved_version, true));
        }

        let mut score_delta = 0.0;
        let mut justification = Vec::new();
        for (scored_version, already_resolved) in &scored {
            match self.score_package(&state, scored_version, *already_resolved)? {
                StepOutcome::Scored { score, justification: added } => {
                    score_delta += score;
                    justification.extend(added);
                }
                StepOutcome::Vetoed => {
                    self.reject_expansion(state, group, tuple);
                    return Ok(Expansion::Continue);
                }
                StepOutcome::Stop => {
                    self.stopped = true;
                    self.predictor.finalize_state(state.id());
                    return Ok(Expansion::Stop);
                }
            }
        }

        // Alternatives of the same dependency stay with the original state
        let mut child = if state.unresolved_dependencies().contains_key(group) {
            let child = state.clone_state();
            self.push_state(state);
            child
        } else {
            state
        };

        child.remove_unresolved_dependency_subtree(group);
        child.add_resolved_dependency(tuple.clone())?;
        for (name, candidates) in new_groups {
            child.remove_unresolved_dependency_subtree(&name);
            for candidate in candidates {
                child.add_unresolved_dependency_to(&name, candidate)?;
            }
        }
        child.iteration = self.context.iteration;
        child.add_justification(justification);
        child.score += score_delta;

        if child.is_final() {
            self.predictor.set_reward_signal(&self.context, &child, tuple, f64::INFINITY);
            return Ok(Expansion::Final(child));
        }

        self.predictor.set_reward_signal(&self.context, &child, tuple, score_delta);
        self.push_state(child);
        Ok(Expansion::Continue)
    }

    /// Run the steps on one package version. Steps without multi-package
    /// resolutions skip names already resolved in `state`.
    fn score_package(
        &mut self,
        state: &State,
        package_version: &PackageVersion,
        already_resolved: bool,
    ) -> Result<StepOutcome> {
        let tuple = package_version.to_tuple();
        let mut score_delta = 0.0;
        let mut justification = Vec::new();

        for step in self.pipeline.steps.iter_mut() {
            if already_resolved && !step.multi_package_resolutions() {
                continue;
            }

            match step.run(&self.context, state, package_version) {
                Ok(Verdict::Accept(None)) => {}
                Ok(Verdict::Accept(Some(result))) => {
                    if let Some(score) = result.score {
                        if !score.is_finite() {
                            return Err(ResolverError::Step {
                                unit: step.name().to_string(),
                                package: tuple.to_string(),
                                message: format!("score {} is not a finite number", score),
                            });
                        }
                        score_delta += score;
                    }
                    justification.extend(result.justification);
                }
                Ok(Verdict::Reject(reason)) | Ok(Verdict::SkipPackage(reason)) => {
                    if self.context.first_rejection(&tuple) {
                        debug!("Step {} rejected {}: {}", step.name(), tuple, reason);
                    }
                    return Ok(StepOutcome::Vetoed);
                }
                Ok(Verdict::StopPipeline(reason)) => {
                    info!("Step {} stopped the resolution: {}", step.name(), reason);
                    return Ok(StepOutcome::Stop);
                }
                Err(err) => {
                    return Err(ResolverError::Step {
                        unit: step.name().to_string(),
                        package: tuple.to_string(),
                        message: format!("{:#}", err),
                    });
                }
            }
        }

        Ok(StepOutcome::Scored {
            score: score_delta,
            justification,
        })
    }

    /// Run strides and wraps on a final state. `None` when it was discarded.
    fn accept_final_state(&mut self, mut state: State) -> Result<Option<State>> {
        for stride in self.pipeline.strides.iter_mut() {
            match stride.run(&self.context, &state) {
                Ok(Verdict::Accept(())) => {}
                Ok(Verdict::Reject(reason)) | Ok(Verdict::SkipPackage(reason)) => {
                    debug!(
                        "Stride {} discarded final state {}: {}",
                        stride.name(),
                        state.id(),
                        reason
                    );
                    self.context.discarded_final_states_count += 1;
                    self.predictor.finalize_state(state.id());
                    return Ok(None);
                }
                Ok(Verdict::StopPipeline(reason)) => {
                    info!("Stride {} stopped the resolution: {}", stride.name(), reason);
                    self.stopped = true;
                    self.predictor.finalize_state(state.id());
                    return Ok(None);
                }
                Err(err) => {
                    return Err(ResolverError::Stride {
                        unit: stride.name().to_string(),
                        state: state.id().get(),
                        message: format!("{:#}", err),
                    });
                }
            }
        }

        for wrap in self.pipeline.wraps.iter_mut() {
            wrap.run(&self.context, &mut state).map_err(|err| ResolverError::Wrap {
                unit: wrap.name().to_string(),
                state: state.id().get(),
                message: format!("{:#}", err),
            })?;
        }

        self.context.accepted_final_states_count += 1;
        self.predictor.finalize_state(state.id());
        info!(
            "Accepted final state {} with score {} ({} accepted so far)",
            state.id(),
            state.score,
            self.context.accepted_final_states_count
        );
        Ok(Some(state))
    }

    /// Signal a failed expansion.
    fn reject_expansion(&mut self, state: State, group: &str, tuple: &PackageTuple) {
        self.predictor.set_reward_signal(&self.context, &state, tuple, f64::NAN);
        self.return_or_finalize(state, group);
    }

    /// Put the state back when `group` still has candidates to try.
    fn return_or_finalize(&mut self, state: State, group: &str) {
        if state.unresolved_dependencies().contains_key(group) {
            self.push_state(state);
        } else {
            debug!("State {} has no candidates of {} left", state.id(), group);
            self.predictor.finalize_state(state.id());
        }
    }

    fn stop_with(&mut self, state: State) -> Expansion {
        self.stopped = true;
        self.predictor.finalize_state(state.id());
        Expansion::Stop
    }
}

impl Iterator for Products<'_> {
    type Item = Result<Product>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_final_state() {
            Ok(Some(state)) => Some(Product::from_state(&self.context, state)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl Drop for Products<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

fn not_found_as_empty<T>(result: std::result::Result<Vec<T>, GraphError>) -> Result<Vec<T>> {
    match result {
        Ok(values) => Ok(values),
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

fn skip_package(context: &mut Context, name: &str, reason: &str) {
    info!("Package {} removed from resolution: {}", name, reason);
    context.skip_package(name);
    context.add_stack_info(
        Justification::info(format!("Package {} was removed from the resolution: {}", name, reason))
            .with_package(name),
    );
}

/// Candidates of one dependency after pseudonyms, sorting, sieves and the
/// latest-versions limit. Every tuple in `tuples` must be registered.
fn build_group(
    pipeline: &mut Pipeline,
    context: &mut Context,
    name: &str,
    mut tuples: Vec<PackageTuple>,
    dependent: Option<&PackageTuple>,
    develop: bool,
) -> Result<Verdict<Vec<PackageTuple>>> {
    if !pipeline.pseudonyms.is_empty() {
        let mut alternatives = Vec::new();
        for tuple in &tuples {
            let package_version = context
                .get_package_version(tuple, false)?
                .cloned()
                .ok_or_else(|| {
                    ResolverError::Internal(format!("package {} was never registered", tuple))
                })?;
            for pseudonym in pipeline.pseudonyms.iter_mut() {
                let offered = pseudonym.run(context, &package_version).map_err(|err| {
                    ResolverError::Pseudonym {
                        unit: pseudonym.name().to_string(),
                        package: tuple.to_string(),
                        message: format!("{:#}", err),
                    }
                })?;
                alternatives.extend(offered);
            }
        }

        for alternative in alternatives {
            if !tuples.contains(&alternative) {
                debug!("Considering {} in place of {}", alternative, name);
                context.register_package_tuple(&alternative, dependent, develop, &[], None);
                tuples.push(alternative);
            }
        }
    }

    sort_latest_first(&mut tuples);

    let mut package_versions = Vec::with_capacity(tuples.len());
    for tuple in &tuples {
        if let Some(package_version) = context.get_package_version(tuple, false)? {
            package_versions.push(package_version.clone());
        }
    }

    for sieve in pipeline.sieves.iter_mut() {
        if package_versions.is_empty() {
            break;
        }
        match sieve.run(context, package_versions) {
            Ok(Verdict::Accept(filtered)) => package_versions = filtered,
            Ok(Verdict::Reject(reason)) => return Ok(Verdict::Reject(reason)),
            Ok(Verdict::SkipPackage(reason)) => return Ok(Verdict::SkipPackage(reason)),
            Ok(Verdict::StopPipeline(reason)) => return Ok(Verdict::StopPipeline(reason)),
            Err(err) => {
                return Err(ResolverError::Sieve {
                    unit: sieve.name().to_string(),
                    package: name.to_string(),
                    message: format!("{:#}", err),
                });
            }
        }
    }

    let mut group: Vec<PackageTuple> =
        package_versions.iter().map(PackageVersion::to_tuple).collect();
    if let Some(limit) = context.limit_latest_versions {
        group.truncate(limit);
    }
    Ok(Verdict::Accept(group))
}
