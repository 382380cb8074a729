//! Predictors decide which state to expand next and which of its pending
//! dependencies to resolve.

mod approximating_latest;
mod hill_climbing;
mod random_walk;
mod sampling;

pub use approximating_latest::ApproximatingLatest;
pub use hill_climbing::HillClimbing;
pub use random_walk::RandomWalk;
pub use sampling::Sampling;

use std::fmt;
use std::str::FromStr;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::package::PackageTuple;
use crate::product::Report;
use crate::state::{State, StateId};

/// Scheduling policy of the search.
pub trait Predictor: Send {
    fn name(&self) -> &'static str;

    /// Called once before the first `run`.
    fn pre_run(&mut self, _context: &Context) {}

    /// Pick a state held by `context.beam` and one of its unresolved
    /// dependencies.
    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)>;

    /// Feedback after every expansion attempt: NaN when it was rejected,
    /// `+inf` when it produced a final state, otherwise the score change.
    fn set_reward_signal(
        &mut self,
        _context: &Context,
        _state: &State,
        _package_tuple: &PackageTuple,
        _reward: f64,
    ) {
    }

    /// The state will not be seen again.
    fn finalize_state(&mut self, _state_id: StateId) {}

    fn post_run(&mut self, _context: &Context) {}

    fn post_run_report(&mut self, _report: &mut Report) {}
}

/// Built-in predictors selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictorKind {
    #[default]
    ApproximatingLatest,
    HillClimbing,
    RandomWalk,
    Sampling,
}

impl PredictorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictorKind::ApproximatingLatest => "approximating-latest",
            PredictorKind::HillClimbing => "hill-climbing",
            PredictorKind::RandomWalk => "random-walk",
            PredictorKind::Sampling => "sampling",
        }
    }

    /// Instantiate the predictor; random ones are seeded for reproducible runs.
    pub fn build(self, seed: Option<u64>) -> Box<dyn Predictor> {
        match self {
            PredictorKind::ApproximatingLatest => Box::new(ApproximatingLatest::default()),
            PredictorKind::HillClimbing => Box::new(HillClimbing::new(seeded_rng(seed))),
            PredictorKind::RandomWalk => Box::new(RandomWalk::new(seeded_rng(seed))),
            PredictorKind::Sampling => Box::new(Sampling::new(seeded_rng(seed))),
        }
    }
}

impl FromStr for PredictorKind {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "approximating-latest" | "latest" => Ok(PredictorKind::ApproximatingLatest),
            "hill-climbing" => Ok(PredictorKind::HillClimbing),
            "random-walk" => Ok(PredictorKind::RandomWalk),
            "sampling" => Ok(PredictorKind::Sampling),
            other => Err(ResolverError::Config(format!("unknown predictor {}", other))),
        }
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Counts of reward signals, logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardStats {
    pub rejected: u64,
    pub final_states: u64,
    pub expanded: u64,
}

impl RewardStats {
    pub fn record(&mut self, reward: f64) {
        if reward.is_nan() {
            self.rejected += 1;
        } else if reward.is_infinite() {
            self.final_states += 1;
        } else {
            self.expanded += 1;
        }
    }

    pub fn log(&self, predictor: &str) {
        info!(
            "Predictor {}: {} expansions, {} rejections, {} final states",
            predictor, self.expanded, self.rejected, self.final_states
        );
    }
}

/// First pending dependency of a state held by the beam.
fn first_unresolved(context: &Context, state_id: StateId) -> Result<(StateId, PackageTuple)> {
    let state = context
        .beam
        .get_by_id(state_id)
        .ok_or_else(|| ResolverError::Internal(format!("state {} is not in the beam", state_id)))?;
    let tuple = state.get_first_unresolved_dependency().ok_or_else(|| {
        ResolverError::Internal(format!("state {} has no unresolved dependencies", state_id))
    })?;
    Ok((state_id, tuple.clone()))
}

fn no_unresolved(state: &State) -> ResolverError {
    ResolverError::Internal(format!("state {} has no unresolved dependencies", state.id()))
}
