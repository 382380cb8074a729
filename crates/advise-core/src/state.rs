//! Partial and final resolution states.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use serde::Serialize;

use crate::error::{ResolverError, Result};
use crate::package::{Justification, PackageTuple};
use crate::project::RuntimeEnvironment;

static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a state. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateId(u64);

impl StateId {
    fn next() -> Self {
        StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Candidates still pending resolution, grouped by dependency name. A group
/// may hold several versions, indexes and pseudonyms of the same dependency.
pub type UnresolvedDependencies = IndexMap<String, IndexSet<PackageTuple>>;

/// One node of the search: what is resolved so far, what is still pending,
/// and how good the partial stack looks.
#[derive(Debug, Serialize)]
pub struct State {
    id: StateId,
    pub score: f64,
    /// Resolver iteration in which the state was created or last changed
    pub iteration: u64,
    unresolved_dependencies: UnresolvedDependencies,
    resolved_dependencies: IndexMap<String, PackageTuple>,
    pub justification: Vec<Justification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advised_runtime_environment: Option<RuntimeEnvironment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advised_manifest_changes: Vec<serde_json::Value>,
}

impl Default for State {
    fn default() -> Self {
        Self::new(0.0, 0)
    }
}

impl State {
    pub fn new(score: f64, iteration: u64) -> Self {
        Self {
            id: StateId::next(),
            score,
            iteration,
            unresolved_dependencies: IndexMap::new(),
            resolved_dependencies: IndexMap::new(),
            justification: Vec::new(),
            advised_runtime_environment: None,
            advised_manifest_changes: Vec::new(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn is_final(&self) -> bool {
        self.unresolved_dependencies.is_empty()
    }

    pub fn resolved_dependencies(&self) -> &IndexMap<String, PackageTuple> {
        &self.resolved_dependencies
    }

    pub fn unresolved_dependencies(&self) -> &UnresolvedDependencies {
        &self.unresolved_dependencies
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved_dependencies.contains_key(name)
    }

    /// Name of the unresolved group holding `tuple`.
    pub fn unresolved_group_of(&self, tuple: &PackageTuple) -> Option<&str> {
        if let Some((_, key, group)) = self.unresolved_dependencies.get_full(&tuple.name) {
            if group.contains(tuple) {
                return Some(key.as_str());
            }
        }
        self.unresolved_dependencies
            .iter()
            .find(|(_, group)| group.contains(tuple))
            .map(|(key, _)| key.as_str())
    }

    pub fn is_unresolved(&self, tuple: &PackageTuple) -> bool {
        self.unresolved_group_of(tuple).is_some()
    }

    /// Add a pending candidate under the tuple's own name.
    pub fn add_unresolved_dependency(&mut self, tuple: PackageTuple) -> Result<()> {
        let group = tuple.name.clone();
        self.add_unresolved_dependency_to(&group, tuple)
    }

    /// Add a pending candidate under an explicit group name. Identical tuples
    /// are stored once.
    pub fn add_unresolved_dependency_to(&mut self, group: &str, tuple: PackageTuple) -> Result<()> {
        if self.resolved_dependencies.contains_key(group) {
            return Err(ResolverError::Internal(format!(
                "cannot add unresolved {} to state {}: {} is already resolved",
                tuple, self.id, group
            )));
        }
        self.unresolved_dependencies
            .entry(group.to_string())
            .or_default()
            .insert(tuple);
        Ok(())
    }

    /// Record a resolved package, dropping any alternatives still pending
    /// under its name. Resolving a name twice with different tuples is an
    /// internal error.
    pub fn add_resolved_dependency(&mut self, tuple: PackageTuple) -> Result<()> {
        if let Some(existing) = self.resolved_dependencies.get(&tuple.name) {
            if *existing != tuple {
                return Err(ResolverError::Internal(format!(
                    "state {} already resolved {} while adding {}",
                    self.id, existing, tuple
                )));
            }
            return Ok(());
        }
        self.unresolved_dependencies.shift_remove(&tuple.name);
        self.resolved_dependencies.insert(tuple.name.clone(), tuple);
        Ok(())
    }

    /// Remove one pending candidate; an emptied group disappears.
    pub fn remove_unresolved_dependency(&mut self, tuple: &PackageTuple) -> bool {
        let Some(group) = self.unresolved_group_of(tuple).map(str::to_string) else {
            return false;
        };
        let mut emptied = false;
        if let Some(candidates) = self.unresolved_dependencies.get_mut(&group) {
            candidates.shift_remove(tuple);
            emptied = candidates.is_empty();
        }
        if emptied {
            self.unresolved_dependencies.shift_remove(&group);
        }
        true
    }

    /// Drop every pending alternative of a dependency.
    pub fn remove_unresolved_dependency_subtree(
        &mut self,
        name: &str,
    ) -> Option<IndexSet<PackageTuple>> {
        self.unresolved_dependencies.shift_remove(name)
    }

    /// Commit to `tuple`: its whole unresolved group goes away and the tuple
    /// becomes resolved.
    pub fn mark_dependency_resolved(&mut self, tuple: &PackageTuple) -> Result<()> {
        let group = self.unresolved_group_of(tuple).map(str::to_string).ok_or_else(|| {
            ResolverError::Internal(format!(
                "{} is not unresolved in state {}",
                tuple, self.id
            ))
        })?;
        self.unresolved_dependencies.shift_remove(&group);
        self.add_resolved_dependency(tuple.clone())
    }

    pub fn get_first_unresolved_dependency(&self) -> Option<&PackageTuple> {
        self.unresolved_dependencies
            .values()
            .next()
            .and_then(|group| group.first())
    }

    /// Pick a random pending candidate. With `prefer_recent` the choice of
    /// group leans towards the most recently added ones.
    pub fn get_random_unresolved_dependency<R: Rng + ?Sized>(
        &self,
        prefer_recent: bool,
        rng: &mut R,
    ) -> Option<&PackageTuple> {
        let groups = self.unresolved_dependencies.len();
        if groups == 0 {
            return None;
        }

        let index = if prefer_recent {
            rng.gen_range(0..groups).max(rng.gen_range(0..groups))
        } else {
            rng.gen_range(0..groups)
        };

        let (_, group) = self.unresolved_dependencies.get_index(index)?;
        if group.is_empty() {
            return None;
        }
        group.get_index(rng.gen_range(0..group.len()))
    }

    /// Append entries that are not present yet.
    pub fn add_justification(&mut self, justification: Vec<Justification>) {
        for entry in justification {
            if !self.justification.contains(&entry) {
                self.justification.push(entry);
            }
        }
    }

    /// Copy with a fresh id. Score, justification and both dependency maps
    /// are duplicated.
    pub fn clone_state(&self) -> State {
        State {
            id: StateId::next(),
            score: self.score,
            iteration: self.iteration,
            unresolved_dependencies: self.unresolved_dependencies.clone(),
            resolved_dependencies: self.resolved_dependencies.clone(),
            justification: self.justification.clone(),
            advised_runtime_environment: self.advised_runtime_environment.clone(),
            advised_manifest_changes: self.advised_manifest_changes.clone(),
        }
    }
}
