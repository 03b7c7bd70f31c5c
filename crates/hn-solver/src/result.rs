//! Solution of a steady-state solve.

use hn_core::{LinkId, NodeId};
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Participation of a link in the solve that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Open,
    Closed,
    /// Fixed-flow pump.
    Fixed,
}

/// Pressure/flow field for one solve.
///
/// Node vectors are indexed by node, link vectors by link. Heads and
/// pressures are in m, flows in m³/h (positive from → to), head losses in m.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub heads: Vec<f64>,
    pub pressures: Vec<f64>,
    pub flows: Vec<f64>,
    pub headlosses: Vec<f64>,
    pub link_status: Vec<LinkStatus>,
    pub converged: bool,
    pub iterations: usize,
    /// Max nodal mass-balance residual (m³/h)
    pub max_residual: f64,
    /// Max head-loss equation error (m)
    pub max_head_error: f64,
}

impl SolveResult {
    /// Turn a non-converged result into `SolverError::NotConverged`.
    pub fn require_converged(self) -> SolverResult<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(SolverError::NotConverged {
                iterations: self.iterations,
                max_residual: self.max_residual,
                max_head_error: self.max_head_error,
            })
        }
    }

    pub fn pressure(&self, node: NodeId) -> f64 {
        self.pressures[node.idx()]
    }

    pub fn head(&self, node: NodeId) -> f64 {
        self.heads[node.idx()]
    }

    pub fn flow(&self, link: LinkId) -> f64 {
        self.flows[link.idx()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(converged: bool) -> SolveResult {
        SolveResult {
            heads: vec![10.0],
            pressures: vec![10.0],
            flows: vec![],
            headlosses: vec![],
            link_status: vec![],
            converged,
            iterations: 7,
            max_residual: 0.5,
            max_head_error: 0.1,
        }
    }

    #[test]
    fn require_converged_passes_through() {
        assert!(result(true).require_converged().is_ok());
        assert_eq!(
            result(false).require_converged(),
            Err(SolverError::NotConverged {
                iterations: 7,
                max_residual: 0.5,
                max_head_error: 0.1
            })
        );
    }
}
