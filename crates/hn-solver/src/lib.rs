//! Steady-state hydraulic solver for water networks.
//!
//! This crate provides a global-gradient Newton solver where the unknowns are
//! heads at free nodes (junctions, pump stations) and flows in every active
//! link. Reservoirs and tanks fix the head at their node.

pub mod assembly;
pub mod controls;
pub mod error;
pub mod initialization;
pub mod newton;
pub mod problem;
pub mod result;
pub mod solve;

pub use controls::{Controls, PumpState};
pub use error::{SolverError, SolverResult};
pub use newton::NewtonConfig;
pub use problem::HydraulicProblem;
pub use result::{LinkStatus, SolveResult};
pub use solve::{solve, solve_with};
