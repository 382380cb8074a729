//! Resolved stacks and the report summarizing a run.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::beam::BeamHistoryEntry;
use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::package::{Justification, StackInfo};
use crate::project::RuntimeEnvironment;
use crate::state::State;

/// One pinned package of a stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinnedPackage {
    pub name: String,
    pub version: String,
    pub index_url: String,
    pub develop: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
    pub hashes: Vec<String>,
}

/// A fully resolved stack built from a final state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub score: f64,
    /// Pinned packages sorted by name
    pub packages: Vec<PinnedPackage>,
    pub justification: Vec<Justification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advised_runtime_environment: Option<RuntimeEnvironment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advised_manifest_changes: Vec<serde_json::Value>,
}

impl Product {
    pub fn from_state(context: &Context, state: State) -> Result<Self> {
        let mut packages = Vec::with_capacity(state.resolved_dependencies().len());
        for tuple in state.resolved_dependencies().values() {
            let package_version = context
                .get_package_version(tuple, false)?
                .ok_or_else(|| {
                    ResolverError::Internal(format!("package {} was never registered", tuple))
                })?;

            let hashes = match context.graph().get_python_package_hashes_sha256(tuple) {
                Ok(hashes) => hashes,
                Err(err) if err.is_not_found() => Vec::new(),
                Err(err) => return Err(err.into()),
            };

            packages.push(PinnedPackage {
                name: tuple.name.clone(),
                version: tuple.version.clone(),
                index_url: tuple.index_url.clone(),
                develop: package_version.develop,
                extras: package_version.extras.clone(),
                markers: package_version.markers.clone(),
                hashes,
            });
        }
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            score: state.score,
            packages,
            justification: state.justification,
            advised_runtime_environment: state.advised_runtime_environment,
            advised_manifest_changes: state.advised_manifest_changes,
        })
    }

    pub fn get(&self, name: &str) -> Option<&PinnedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// `name -> ==version` pins, as written to a lock file.
    pub fn locked(&self) -> IndexMap<String, String> {
        self.packages
            .iter()
            .map(|p| (p.name.clone(), format!("=={}", p.version)))
            .collect()
    }
}

/// The best stacks of a run plus run statistics.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub count: usize,
    pub products: Vec<Product>,
    pub stack_info: Vec<StackInfo>,
    pub accepted_final_states: u64,
    pub discarded_final_states: u64,
    pub iterations: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_packages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub beam_history: Vec<BeamHistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            products: Vec::new(),
            stack_info: Vec::new(),
            accepted_final_states: 0,
            discarded_final_states: 0,
            iterations: 0,
            skipped_packages: Vec::new(),
            beam_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Keep the product if it ranks among the best `count`. Equal scores keep
    /// the order in which products were produced.
    pub fn add_product(&mut self, product: Product) {
        let position = self
            .products
            .iter()
            .position(|p| p.score < product.score)
            .unwrap_or(self.products.len());
        if position >= self.count {
            return;
        }
        self.products.insert(position, product);
        self.products.truncate(self.count);
    }

    /// Copy run statistics from the context.
    pub fn record_run(&mut self, context: &Context) {
        self.stack_info = context.stack_info().to_vec();
        self.accepted_final_states = context.accepted_final_states_count;
        self.discarded_final_states = context.discarded_final_states_count;
        self.iterations = context.iteration;
        self.skipped_packages = context.skipped_packages().map(str::to_string).collect();
        self.beam_history = context.beam.history().to_vec();
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Report for a failed run.
    pub fn from_error(error: &ResolverError, stack_info: &[StackInfo]) -> serde_json::Value {
        json!({
            "ERROR": error.to_string(),
            "resolution_failure": error.is_resolution_failure(),
            "stack_info": stack_info,
            "created_at": Utc::now(),
        })
    }
}
