//! hn-schedule: pump schedule optimization for hydronet.
//!
//! Provides:
//! - Per-period linear programs minimizing pump energy cost subject to
//!   demand, pump capacity and monitored-pressure constraints
//! - Pluggable LP backends (`LpBackend`, default clarabel through good_lp)
//! - Pluggable pressure models (`PressureModel`): a linear surrogate and a
//!   hydraulic oracle backed by the network solver
//! - Infeasibility diagnosis naming the period and constraint class
//! - Cached incremental re-optimization

pub mod backend;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod oracle;
pub mod polish;
pub mod pressure;
pub mod types;

pub use backend::{ClarabelBackend, LinearProgram, LpBackend, LpOutcome, LpRow};
pub use config::OptimizerConfig;
pub use error::{InfeasibilityClass, InfeasibleSchedule, ScheduleError, ScheduleResult};
pub use optimizer::{ScheduleOptimizer, optimize};
pub use oracle::HydraulicOracle;
pub use pressure::{LinearSurrogate, NoPressureModel, PressureModel};
pub use types::{PressureBound, PumpScheduleEntry, PumpSpec, Schedule, ScheduleRequest};
