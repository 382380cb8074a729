pub mod beam;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod package;
pub mod pipeline;
pub mod predictor;
pub mod product;
pub mod project;
pub mod resolver;
pub mod state;

pub use beam::Beam;
pub use config::{ConfigSource, ResolverConfig};
pub use context::{Context, PackageVersionId};
pub use error::{ResolverError, Result};
pub use graph::{DependencyEdge, GraphDatabase, GraphError, MemoryGraph, SolvedPackage};
pub use package::{Justification, JustificationType, PackageTuple, PackageVersion, StackInfo};
pub use pipeline::{
    Boot, Pipeline, PipelineBuilder, Pseudonym, Sieve, Step, StepResult, Stride, Unit, UnitResult,
    Verdict, Wrap,
};
pub use predictor::{Predictor, PredictorKind};
pub use product::{PinnedPackage, Product, Report};
pub use project::{Project, Requirement, RuntimeEnvironment};
pub use resolver::{Products, Resolver, StopHandle};
pub use state::{State, StateId};
