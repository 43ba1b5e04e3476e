use std::path::PathBuf;
use thiserror::Error;

use crate::loader::ValidationReport;

/// Top-level error for every pipeline stage. The CLI maps each variant to its
/// documented exit code.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The catalog failed schema, referential, or invariant validation.
    #[error("catalog validation failed\n{0}")]
    Validation(ValidationReport),

    /// The solver proved no assignment satisfies the hard constraints. The
    /// payload names the constraint families that were applied.
    #[error("no weekly assignment satisfies the hard constraints ({0})")]
    Infeasible(String),

    /// The solver exceeded the requested wall-clock bound.
    #[error("solver exceeded the wall-clock limit of {0} s")]
    Timeout(u64),

    /// The solver failed for a reason other than infeasibility.
    #[error("solver error: {0}")]
    Solver(String),

    /// A state the loader's invariants should have made impossible.
    #[error("internal inconsistency: {0}")]
    Internal(String),

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PlannerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlannerError::Io {
            path: path.into(),
            source,
        }
    }
}
