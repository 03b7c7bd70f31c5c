//! Linearized head system for one global-gradient step.
//!
//! Each conducting link k between nodes u → v is linearized at its current
//! flow Q with head loss h and gradient g:
//!
//! ```text
//! p = 1/g,  y = p·h
//! Q_new = (Q - y + p·(H_u - H_v)) + p·(δ_u - δ_v)
//! ```
//!
//! where δ are head corrections. Continuity at every free node then gives
//! the symmetric positive definite system `A·δ = r`.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::problem::{HydraulicProblem, LinkMode};

/// Per-link linearization at the current iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTerm {
    /// Inverse gradient (m³/s per m); zero for inactive and fixed links.
    /// Anchored pumps use the gradient at their setpoint.
    pub p: f64,
    /// Flow the link would carry with the current heads (m³/s).
    pub q_lin: f64,
    /// Head loss at the current flow (m).
    pub headloss: f64,
}

/// Linearize every link at `flows` with free heads `heads`.
pub fn linearize(problem: &HydraulicProblem<'_>, heads: &[f64], flows: &[f64]) -> Vec<LinkTerm> {
    problem
        .network
        .links()
        .iter()
        .zip(&problem.modes)
        .zip(flows)
        .map(|((link, mode), &q)| match mode {
            LinkMode::Inactive => LinkTerm {
                p: 0.0,
                q_lin: 0.0,
                headloss: 0.0,
            },
            LinkMode::Fixed(f) => LinkTerm {
                p: 0.0,
                q_lin: *f,
                headloss: problem.head(link.from, heads) - problem.head(link.to, heads),
            },
            LinkMode::Anchored { flow, settings } => {
                let eval = link.element().evaluate(*flow, settings);
                let p = 1.0 / eval.gradient;
                let dh = problem.head(link.from, heads) - problem.head(link.to, heads);
                LinkTerm {
                    p,
                    q_lin: flow - p * eval.headloss + p * dh,
                    headloss: dh,
                }
            }
            LinkMode::Conduct(settings) => {
                let eval = link.element().evaluate(q, settings);
                let p = 1.0 / eval.gradient;
                let dh = problem.head(link.from, heads) - problem.head(link.to, heads);
                LinkTerm {
                    p,
                    q_lin: q - p * eval.headloss + p * dh,
                    headloss: eval.headloss,
                }
            }
        })
        .collect()
}

/// Assemble `A` and the continuity residual `r` over free-node rows.
pub fn assemble(problem: &HydraulicProblem<'_>, terms: &[LinkTerm]) -> (DMatrix<f64>, DVector<f64>) {
    let n = problem.index.len();
    let mut a = DMatrix::zeros(n, n);
    let mut r = DVector::zeros(n);

    for (row, node) in problem.index.free_nodes().iter().enumerate() {
        r[row] = -problem.demands[node.idx()];
    }

    for (link, term) in problem.network.links().iter().zip(terms) {
        let ru = problem.index.row(link.from);
        let rv = problem.index.row(link.to);
        if let Some(u) = ru {
            a[(u, u)] += term.p;
            r[u] -= term.q_lin;
        }
        if let Some(v) = rv {
            a[(v, v)] += term.p;
            r[v] += term.q_lin;
        }
        if let (Some(u), Some(v)) = (ru, rv) {
            a[(u, v)] -= term.p;
            a[(v, u)] -= term.p;
        }
    }
    (a, r)
}

/// Solve `A·δ = r`: Cholesky first, LU as fallback.
pub fn solve_linear(a: DMatrix<f64>, r: &DVector<f64>, iteration: usize) -> SolverResult<DVector<f64>> {
    if a.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }
    if let Some(chol) = a.clone().cholesky() {
        return Ok(chol.solve(r));
    }
    tracing::debug!(iteration, "cholesky failed, falling back to LU");
    a.lu()
        .solve(r)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or(SolverError::Singular { iteration })
}
