use rand::rngs::StdRng;

use super::{no_unresolved, Predictor, RewardStats};
use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Expands a random state with a random pending dependency.
#[derive(Debug)]
pub struct RandomWalk {
    rng: StdRng,
    stats: RewardStats,
}

impl RandomWalk {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            stats: RewardStats::default(),
        }
    }
}

impl Predictor for RandomWalk {
    fn name(&self) -> &'static str {
        "RandomWalk"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = context
            .beam
            .get_random(&mut self.rng)
            .ok_or_else(|| {
                ResolverError::Internal("no state to expand in an empty beam".to_string())
            })?;
        let tuple = state
            .get_random_unresolved_dependency(false, &mut self.rng)
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

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::super::tests::{context_with_states, pending_state};
    use super::*;

    #[test]
    fn test_same_seed_same_choices() {
        let context = context_with_states(vec![
            pending_state(1.0, &["attrs", "six"]),
            pending_state(2.0, &["click"]),
            pending_state(3.0, &["flask", "jinja2"]),
        ]);

        let mut first = RandomWalk::new(StdRng::seed_from_u64(5));
        let mut second = RandomWalk::new(StdRng::seed_from_u64(5));
        for _ in 0..10 {
            let (state_id, tuple) = first.run(&context).unwrap();
            assert_eq!(second.run(&context).unwrap(), (state_id, tuple.clone()));

            let state = context.beam.get_by_id(state_id).unwrap();
            assert!(state.is_unresolved(&tuple));
        }
    }
}
