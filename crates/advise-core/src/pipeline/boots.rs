use log::warn;

use super::{Boot, Unit, UnitResult, Verdict};
use crate::context::Context;
use crate::package::Justification;

/// Warns when the runtime environment is only partially known, since
/// environment markers are then left unevaluated.
#[derive(Debug, Default)]
pub struct RuntimeEnvironmentBoot;

impl Unit for RuntimeEnvironmentBoot {}

impl Boot for RuntimeEnvironmentBoot {
    fn run(&mut self, context: &mut Context) -> UnitResult<()> {
        let environment = context.runtime_environment();
        if environment.is_fully_specified() {
            return Ok(Verdict::Accept(()));
        }

        let mut missing = Vec::new();
        if environment.os_name().is_none() {
            missing.push("operating system name");
        }
        if environment.os_version().is_none() {
            missing.push("operating system version");
        }
        if environment.python_version().is_none() {
            missing.push("Python version");
        }

        let message = format!(
            "Runtime environment is not fully specified (missing {}); \
             environment markers are not evaluated",
            missing.join(", ")
        );
        warn!("{}", message);
        context.add_stack_info(Justification::warning(message));

        Ok(Verdict::Accept(()))
    }
}
