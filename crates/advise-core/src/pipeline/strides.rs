use super::{Stride, Unit, UnitResult, Verdict};
use crate::context::Context;
use crate::state::State;

/// Discards final states scoring below a threshold.
#[derive(Debug)]
pub struct ScoreThresholdStride {
    threshold: f64,
}

impl ScoreThresholdStride {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Unit for ScoreThresholdStride {}

impl Stride for ScoreThresholdStride {
    fn run(&mut self, _context: &Context, state: &State) -> UnitResult<()> {
        if state.score < self.threshold {
            return Ok(Verdict::reject(format!(
                "State score {} is below threshold {}",
                state.score, self.threshold
            )));
        }
        Ok(Verdict::Accept(()))
    }
}
