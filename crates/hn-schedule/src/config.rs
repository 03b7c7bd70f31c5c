//! Optimizer configuration.

use hn_solver::NewtonConfig;
use serde::{Deserialize, Serialize};

/// Tolerances and oracle settings. Every tolerance is an input; the
/// defaults are conservative starting values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Slack allowed on flow constraints after polishing (m³/h)
    pub feasibility_tolerance: f64,
    /// Slack allowed on monitored pressure bounds (m)
    pub pressure_tolerance_m: f64,
    /// Re-linearizations of the pressure model per period
    pub max_refinements: usize,
    /// Candidate movement (m³/h) below which re-linearization stops
    pub refinement_tolerance_m3h: f64,
    /// Finite-difference step for pressure sensitivities (m³/h)
    pub finite_difference_step_m3h: f64,
    /// Hydraulic solver settings for oracle calls
    pub solver: NewtonConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            feasibility_tolerance: 1e-6,
            pressure_tolerance_m: 0.01,
            max_refinements: 6,
            refinement_tolerance_m3h: 0.01,
            finite_difference_step_m3h: 1.0,
            solver: NewtonConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Canonical text used in cache keys.
    pub(crate) fn fingerprint(&self) -> String {
        format!(
            "{:x}:{:x}:{}:{:x}:{:x}:{:?}",
            self.feasibility_tolerance.to_bits(),
            self.pressure_tolerance_m.to_bits(),
            self.max_refinements,
            self.refinement_tolerance_m3h.to_bits(),
            self.finite_difference_step_m3h.to_bits(),
            self.solver
        )
    }
}
