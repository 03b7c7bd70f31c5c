//! Error types for the hn-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates' errors behind one
/// interface for front ends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to write project file: {path}")]
    ProjectFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Alert delivery failed: {0}")]
    Alert(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hn-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<hn_project::ProjectError> for AppError {
    fn from(err: hn_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<hn_network::NetworkError> for AppError {
    fn from(err: hn_network::NetworkError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<hn_solver::SolverError> for AppError {
    fn from(err: hn_solver::SolverError) -> Self {
        match err {
            hn_solver::SolverError::Cancelled { .. } => AppError::Cancelled,
            other => AppError::Solver(other.to_string()),
        }
    }
}

impl From<hn_anomaly::AnomalyError> for AppError {
    fn from(err: hn_anomaly::AnomalyError) -> Self {
        AppError::Detection(err.to_string())
    }
}

impl From<hn_schedule::ScheduleError> for AppError {
    fn from(err: hn_schedule::ScheduleError) -> Self {
        match err {
            hn_schedule::ScheduleError::Cancelled { .. } => AppError::Cancelled,
            other => AppError::Schedule(other.to_string()),
        }
    }
}

impl From<hn_results::ResultsError> for AppError {
    fn from(err: hn_results::ResultsError) -> Self {
        match err {
            hn_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
