use super::{Unit, Wrap};
use crate::context::Context;
use crate::package::Justification;
use crate::state::State;

/// Notes packages in a stack that have no known artifact hashes.
#[derive(Debug, Default)]
pub struct ReportHashesWrap;

impl Unit for ReportHashesWrap {}

impl Wrap for ReportHashesWrap {
    fn run(&mut self, context: &Context, state: &mut State) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        for tuple in state.resolved_dependencies().values() {
            let hashes = match context.graph().get_python_package_hashes_sha256(tuple) {
                Ok(hashes) => hashes,
                Err(err) if err.is_not_found() => Vec::new(),
                Err(err) => return Err(err.into()),
            };
            if hashes.is_empty() {
                missing.push(
                    Justification::info(format!("No artifact hashes known for {}", tuple))
                        .with_package(tuple.name.clone()),
                );
            }
        }

        state.add_justification(missing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ResolverConfig;
    use crate::graph::MemoryGraph;
    use crate::package::PackageTuple;
    use crate::project::Project;

    const INDEX: &str = "https://pypi.org/simple";

    #[test]
    fn test_missing_hashes_are_reported() {
        let mut graph = MemoryGraph::new();
        graph.add_package("six", "1.15.0", INDEX).with_hashes(&["sha256:123"]);
        graph.add_package("attrs", "20.1.0", INDEX);
        let context = Context::new(
            Project::default(),
            Arc::new(graph),
            &ResolverConfig::default(),
        )
        .unwrap();

        let mut state = State::default();
        state.add_resolved_dependency(PackageTuple::new("six", "1.15.0", INDEX)).unwrap();
        state.add_resolved_dependency(PackageTuple::new("attrs", "20.1.0", INDEX)).unwrap();
        state.add_resolved_dependency(PackageTuple::new("unknown", "1.0", INDEX)).unwrap();

        ReportHashesWrap.run(&context, &mut state).unwrap();

        let packages: Vec<&str> = state
            .justification
            .iter()
            .filter_map(|j| j.package_name.as_deref())
            .collect();
        assert_eq!(packages, vec!["attrs", "unknown"]);
    }
}
