//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;
use crate::types::RunId;

/// SHA-256 over the topology version, the demand input, the solver
/// parameters and any further run context (detector, optimizer and
/// control settings), each as canonical JSON.
///
/// Identical inputs give identical ids, so a stored run can be reused
/// instead of recomputed.
pub fn compute_run_id(
    topology_version: &str,
    demand_input: &impl Serialize,
    solver_params: &impl Serialize,
    context: &impl Serialize,
) -> ResultsResult<RunId> {
    let mut hasher = Sha256::new();
    hasher.update(topology_version.as_bytes());
    hasher.update([0u8]);
    hasher.update(serde_json::to_vec(demand_input)?);
    hasher.update([0u8]);
    hasher.update(serde_json::to_vec(solver_params)?);
    hasher.update([0u8]);
    hasher.update(serde_json::to_vec(context)?);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_solver::NewtonConfig;

    #[test]
    fn hash_stability() {
        let cfg = NewtonConfig::default();
        let a = compute_run_id("topo", &vec![1.0, 2.0], &cfg, &"base").unwrap();
        let b = compute_run_id("topo", &vec![1.0, 2.0], &cfg, &"base").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let cfg = NewtonConfig::default();
        let base = compute_run_id("topo", &vec![1.0, 2.0], &cfg, &"base").unwrap();
        let demand = compute_run_id("topo", &vec![1.0, 2.5], &cfg, &"base").unwrap();
        let topo = compute_run_id("topo2", &vec![1.0, 2.0], &cfg, &"base").unwrap();
        let solver = compute_run_id(
            "topo",
            &vec![1.0, 2.0],
            &NewtonConfig {
                exponent: 2.0,
                ..cfg
            },
            &"base",
        )
        .unwrap();
        assert_ne!(base, demand);
        assert_ne!(base, topo);
        assert_ne!(base, solver);
    }
}
