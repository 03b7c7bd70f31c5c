//! Error types for solver operations.

use thiserror::Error;

/// Errors that can occur during network solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Nodes isolated from every source by closed or inactive links: {}", nodes.join(", "))]
    IsolatedByControls { nodes: Vec<String> },

    #[error("Head matrix is singular at iteration {iteration}")]
    Singular { iteration: usize },

    #[error("Solve cancelled at iteration {iteration}")]
    Cancelled { iteration: usize },

    #[error(
        "Not converged after {iterations} iterations (mass residual {max_residual:.3e} m3/h, head error {max_head_error:.3e} m)"
    )]
    NotConverged {
        iterations: usize,
        max_residual: f64,
        max_head_error: f64,
    },
}

pub type SolverResult<T> = Result<T, SolverError>;
