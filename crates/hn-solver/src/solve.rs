//! High-level solver interface.

use hn_core::cancel::{CancelToken, is_cancelled};
use hn_core::units::SECONDS_PER_HOUR;
use hn_network::NetworkModel;

use crate::assembly::{LinkTerm, assemble, linearize, solve_linear};
use crate::controls::Controls;
use crate::error::{SolverError, SolverResult};
use crate::initialization::{initial_guess, warm_start};
use crate::newton::NewtonConfig;
use crate::problem::{HydraulicProblem, LinkMode};
use crate::result::{LinkStatus, SolveResult};

/// Solve a network for the given nodal demands (m³/h) and controls.
///
/// A non-converged iteration is not an error: the best iterate comes back
/// with `converged = false`. Use `SolveResult::require_converged` to treat it
/// as one.
pub fn solve(
    network: &NetworkModel,
    demands_m3h: &[f64],
    controls: &Controls,
    config: &NewtonConfig,
) -> SolverResult<SolveResult> {
    solve_with(network, demands_m3h, controls, config, None, None)
}

/// `solve` with an optional warm start and cancellation token.
pub fn solve_with(
    network: &NetworkModel,
    demands_m3h: &[f64],
    controls: &Controls,
    config: &NewtonConfig,
    previous: Option<&SolveResult>,
    cancel: Option<&CancelToken>,
) -> SolverResult<SolveResult> {
    let problem = HydraulicProblem::new(network, demands_m3h, controls, config)?;
    let start = match previous {
        Some(prev) => warm_start(&problem, prev)?,
        None => initial_guess(&problem),
    };
    let mut heads = start.heads;
    let mut flows = start.flows;

    let mut best: Option<Iterate> = None;
    let mut iterations = 0;

    for iteration in 1..=config.max_iterations {
        if is_cancelled(cancel) {
            return Err(SolverError::Cancelled { iteration });
        }
        iterations = iteration;

        let terms = linearize(&problem, &heads, &flows);
        let (a, r) = assemble(&problem, &terms);
        let delta = solve_linear(a, &r, iteration)?;

        for (row, d) in delta.iter().enumerate() {
            heads[row] += d;
        }
        let mut change = 0.0;
        let mut total = 0.0;
        for (k, link) in network.links().iter().enumerate() {
            let t = &terms[k];
            let du = problem.index.row(link.from).map_or(0.0, |u| delta[u]);
            let dv = problem.index.row(link.to).map_or(0.0, |v| delta[v]);
            let q_new = t.q_lin + t.p * (du - dv);
            change += (q_new - flows[k]).abs();
            total += q_new.abs();
            flows[k] = q_new;
        }
        let flow_change = if total > 0.0 { change / total } else { change };

        let (max_residual, max_head_error) = residuals(&problem, &heads, &flows);
        tracing::debug!(iteration, max_residual, max_head_error, flow_change, "gga iteration");

        let score = max_residual.max(max_head_error);
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(Iterate {
                heads: heads.clone(),
                flows: flows.clone(),
                score,
                max_residual,
                max_head_error,
            });
        }

        if max_residual < config.tolerance
            && max_head_error < config.head_tolerance
            && flow_change < config.flow_change_tolerance
        {
            return Ok(build_result(&problem, &heads, &flows, true, iteration, max_residual, max_head_error));
        }
    }

    let Some(best) = best else {
        return Err(SolverError::ProblemSetup {
            what: "no iterations performed".into(),
        });
    };
    tracing::warn!(
        iterations,
        max_residual = best.max_residual,
        max_head_error = best.max_head_error,
        "hydraulic solve did not converge; returning best iterate"
    );
    Ok(build_result(
        &problem,
        &best.heads,
        &best.flows,
        false,
        iterations,
        best.max_residual,
        best.max_head_error,
    ))
}

struct Iterate {
    heads: Vec<f64>,
    flows: Vec<f64>,
    score: f64,
    max_residual: f64,
    max_head_error: f64,
}

/// Max mass-balance residual (m³/h) over free nodes and max head-loss error
/// (m) over head-carrying links.
fn residuals(problem: &HydraulicProblem<'_>, heads: &[f64], flows: &[f64]) -> (f64, f64) {
    let links = problem.network.links();
    let mut imbalance: Vec<f64> = problem.demands.iter().map(|d| -d).collect();
    for (link, &q) in links.iter().zip(flows) {
        imbalance[link.from.idx()] -= q;
        imbalance[link.to.idx()] += q;
    }
    let max_residual = problem
        .index
        .free_nodes()
        .iter()
        .map(|n| imbalance[n.idx()].abs() * SECONDS_PER_HOUR)
        .fold(0.0, f64::max);

    let mut max_head_error: f64 = 0.0;
    for ((link, mode), &q) in links.iter().zip(&problem.modes).zip(flows) {
        let h = match mode {
            LinkMode::Conduct(settings) => link.element().evaluate(q, settings).headloss,
            LinkMode::Anchored { flow, settings } => {
                let at = link.element().evaluate(*flow, settings);
                at.headloss + at.gradient * (q - flow)
            }
            LinkMode::Inactive | LinkMode::Fixed(_) => continue,
        };
        let dh = problem.head(link.from, heads) - problem.head(link.to, heads);
        max_head_error = max_head_error.max((h - dh).abs());
    }
    (max_residual, max_head_error)
}

fn build_result(
    problem: &HydraulicProblem<'_>,
    free_heads: &[f64],
    flows: &[f64],
    converged: bool,
    iterations: usize,
    max_residual: f64,
    max_head_error: f64,
) -> SolveResult {
    let network = problem.network;
    let heads: Vec<f64> = network
        .nodes()
        .iter()
        .map(|n| problem.head(n.id, free_heads))
        .collect();
    let pressures = network
        .nodes()
        .iter()
        .map(|n| heads[n.id.idx()] - n.elevation_m)
        .collect();
    let terms: Vec<LinkTerm> = linearize(problem, free_heads, flows);

    let mut out_flows = Vec::with_capacity(flows.len());
    let mut headlosses = Vec::with_capacity(flows.len());
    let mut link_status = Vec::with_capacity(flows.len());
    for ((mode, &q), term) in problem.modes.iter().zip(flows).zip(&terms) {
        let (flow, status) = match mode {
            LinkMode::Inactive => (0.0, LinkStatus::Closed),
            LinkMode::Fixed(_) | LinkMode::Anchored { .. } => (q, LinkStatus::Fixed),
            LinkMode::Conduct(_) => (q, LinkStatus::Open),
        };
        out_flows.push(flow * SECONDS_PER_HOUR);
        headlosses.push(term.headloss);
        link_status.push(status);
    }

    SolveResult {
        heads,
        pressures,
        flows: out_flows,
        headlosses,
        link_status,
        converged,
        iterations,
        max_residual,
        max_head_error,
    }
}
