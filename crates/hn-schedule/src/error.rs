//! Error types for schedule optimization.

use hn_solver::SolverError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which family of hard constraints cannot be met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibilityClass {
    /// Forecast exceeds the total available pump capacity.
    Demand,
    /// A pump's minimum flow exceeds its available capacity.
    Capacity,
    /// Pressure bounds cannot be reached.
    Pressure,
}

/// A period for which no plan satisfies every hard constraint.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("period {period} infeasible ({class:?}): {detail}")]
pub struct InfeasibleSchedule {
    pub period: usize,
    pub class: InfeasibilityClass,
    pub detail: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error(transparent)]
    Infeasible(#[from] InfeasibleSchedule),

    #[error("optimization cancelled before period {period}")]
    Cancelled { period: usize },

    #[error("invalid schedule input: {what}")]
    InvalidInput { what: String },

    #[error("LP backend '{backend}' failed: {what}")]
    Backend { backend: &'static str, what: String },

    #[error("hydraulic oracle failed: {0}")]
    Solver(#[from] SolverError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

impl ScheduleError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ScheduleError::InvalidInput { what: what.into() }
    }
}
