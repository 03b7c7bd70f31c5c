//! Newton iteration configuration.

use serde::{Deserialize, Serialize};

/// Global-gradient iteration configuration.
///
/// Convergence requires all three criteria at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Max nodal mass-balance residual (m³/h)
    pub tolerance: f64,
    /// Max |h(Q) - (H_from - H_to)| over active links (m)
    pub head_tolerance: f64,
    /// Σ|ΔQ| / Σ|Q| between iterations
    pub flow_change_tolerance: f64,
    /// Hazen-Williams friction exponent
    pub exponent: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-4,
            head_tolerance: 1e-4,
            flow_change_tolerance: 1e-6,
            exponent: 1.852,
        }
    }
}

impl NewtonConfig {
    /// Reject non-positive tolerances and exponents.
    pub fn validate(&self) -> crate::SolverResult<()> {
        let checks = [
            ("tolerance", self.tolerance),
            ("head_tolerance", self.head_tolerance),
            ("flow_change_tolerance", self.flow_change_tolerance),
            ("exponent", self.exponent),
        ];
        for (what, v) in checks {
            if !v.is_finite() || v <= 0.0 {
                return Err(crate::SolverError::ProblemSetup {
                    what: format!("{what} must be positive, got {v}"),
                });
            }
        }
        if self.max_iterations == 0 {
            return Err(crate::SolverError::ProblemSetup {
                what: "max_iterations must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(NewtonConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tolerance_rejected() {
        let cfg = NewtonConfig {
            tolerance: 0.0,
            ..NewtonConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
