use super::{first_unresolved, Predictor, RewardStats};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Keeps expanding the most recently added state with its first pending
/// dependency. Candidate groups are ordered latest first, so the first
/// stack produced is the latest one the constraints allow.
#[derive(Debug, Default)]
pub struct ApproximatingLatest {
    stats: RewardStats,
}

impl Predictor for ApproximatingLatest {
    fn name(&self) -> &'static str {
        "ApproximatingLatest"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = match context.beam.get_last() {
            Some(state) => state,
            None => context.beam.max()?,
        };
        first_unresolved(context, state.id())
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
