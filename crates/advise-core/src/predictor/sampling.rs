use rand::rngs::StdRng;

use super::{first_unresolved, Predictor, RewardStats};
use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Samples a random state and resolves its first pending dependency, which
/// is the latest remaining candidate of the oldest pending group.
#[derive(Debug)]
pub struct Sampling {
    rng: StdRng,
    stats: RewardStats,
}

impl Sampling {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            stats: RewardStats::default(),
        }
    }
}

impl Predictor for Sampling {
    fn name(&self) -> &'static str {
        "Sampling"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state_id = context
            .beam
            .get_random(&mut self.rng)
            .map(State::id)
            .ok_or_else(|| {
                ResolverError::Internal("no state to expand in an empty beam".to_string())
            })?;
        first_unresolved(context, state_id)
    }

    fn set_reward_signal(
        &mut self,
        _context: &Context,
        _state: &State,
        _package_tuple: &PackageTuple,
        reward: f64,
    ) {
        self.stats.record(reward);
    }

    fn post_run(&mut self, _context: &Context) {
        self.stats.log(self.name());
    }
}
