use rand::rngs::StdRng;

use super::{no_unresolved, Predictor, RewardStats};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Always expands the best state in the beam, picking one of its pending
/// dependencies at random with a bias towards recently added ones.
#[derive(Debug)]
pub struct HillClimbing {
    rng: StdRng,
    stats: RewardStats,
}

impl HillClimbing {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            stats: RewardStats::default(),
        }
    }
}

impl Predictor for HillClimbing {
    fn name(&self) -> &'static str {
        "HillClimbing"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = context.beam.max()?;
        let tuple = state
            .get_random_unresolved_dependency(true, &mut self.rng)
            .ok_or_else(|| no_unresolved(state))?;
        Ok((state.id(), tuple.clone()))
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
