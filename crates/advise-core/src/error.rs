use thiserror::Error;

use crate::graph::GraphError;

#[derive(Error, Debug)]
pub enum ResolverError {
    // Resolution impossibility
    #[error("Unable to produce any stack: {0}")]
    CannotProduceStack(String),

    #[error("Unable to resolve direct dependencies: {}", .0.join(", "))]
    UnresolvedDependencies(Vec<String>),

    // Pipeline unit failures
    #[error("Boot {unit} failed: {message}")]
    Boot { unit: String, message: String },

    #[error("Pseudonym {unit} failed for {package}: {message}")]
    Pseudonym {
        unit: String,
        package: String,
        message: String,
    },

    #[error("Sieve {unit} failed for {package}: {message}")]
    Sieve {
        unit: String,
        package: String,
        message: String,
    },

    #[error("Step {unit} failed for {package}: {message}")]
    Step {
        unit: String,
        package: String,
        message: String,
    },

    #[error("Stride {unit} failed on state {state}: {message}")]
    Stride {
        unit: String,
        state: u64,
        message: String,
    },

    #[error("Wrap {unit} failed on state {state}: {message}")]
    Wrap {
        unit: String,
        state: u64,
        message: String,
    },

    // Dependency graph errors
    #[error("Dependency graph error: {0}")]
    Graph(#[from] GraphError),

    // Invariant violations
    #[error("Internal error: {0}")]
    Internal(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Project manifest errors
    #[error("Invalid project: {message}")]
    InvalidProject { message: String },

    #[error("Invalid version specifier: {0}")]
    InvalidSpecifier(#[from] advise_version::SpecifierError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl ResolverError {
    /// Errors meaning no stack exists for the given data, as opposed to
    /// failures of the resolver or its units.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            ResolverError::CannotProduceStack(_) | ResolverError::UnresolvedDependencies(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
