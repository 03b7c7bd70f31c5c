//! Initial guess for the head/flow iteration.
//!
//! Flows are seeded on the breadth-first spanning tree: each tree link
//! carries the total demand of the subtree it feeds. Free heads start at the
//! head of the source their tree hangs from. With zero demand everywhere this
//! guess is already the exact solution.

use hn_core::units::SECONDS_PER_HOUR;

use crate::error::{SolverError, SolverResult};
use crate::problem::{HydraulicProblem, LinkMode};
use crate::result::SolveResult;

/// Starting point: free heads (by matrix row) and link flows (m³/s).
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub heads: Vec<f64>,
    pub flows: Vec<f64>,
}

/// Spanning-tree guess.
pub fn initial_guess(problem: &HydraulicProblem<'_>) -> InitialState {
    let network = problem.network;
    let order = &problem.order;
    let links = network.links();

    // Subtree demand, accumulated leaf to root.
    let mut subtree = problem.demands.clone();
    for &node in order.order.iter().rev() {
        if let Some(lid) = order.parent_link[node.idx()] {
            let parent = links[lid.idx()].other(node);
            subtree[parent.idx()] += subtree[node.idx()];
        }
    }

    let mut flows = vec![0.0; links.len()];
    for (i, link) in links.iter().enumerate() {
        match problem.modes[i] {
            LinkMode::Fixed(q) | LinkMode::Anchored { flow: q, .. } => flows[i] = q,
            LinkMode::Inactive | LinkMode::Conduct(_) => {}
        }
    }
    for &node in &order.order {
        if let Some(lid) = order.parent_link[node.idx()] {
            let link = &links[lid.idx()];
            let q = subtree[node.idx()];
            flows[lid.idx()] = if link.to == node { q } else { -q };
        }
    }

    // Root head, propagated root to leaf.
    let mut root_head = vec![0.0; network.nodes().len()];
    for &node in &order.order {
        root_head[node.idx()] = match problem.fixed_heads[node.idx()] {
            Some(h) => h,
            None => order.parent_link[node.idx()]
                .map_or(0.0, |lid| root_head[links[lid.idx()].other(node).idx()]),
        };
    }
    let heads = problem
        .index
        .free_nodes()
        .iter()
        .map(|n| root_head[n.idx()])
        .collect();

    InitialState { heads, flows }
}

/// Warm start from a previous result on the same network.
///
/// Inactive links restart at zero flow; fixed-flow and anchored links take
/// their setpoint.
pub fn warm_start(problem: &HydraulicProblem<'_>, previous: &SolveResult) -> SolverResult<InitialState> {
    let network = problem.network;
    if previous.heads.len() != network.nodes().len() || previous.flows.len() != network.links().len()
    {
        return Err(SolverError::ProblemSetup {
            what: "warm start does not match network size".into(),
        });
    }
    let heads = problem
        .index
        .free_nodes()
        .iter()
        .map(|n| previous.heads[n.idx()])
        .collect();
    let flows = problem
        .modes
        .iter()
        .zip(&previous.flows)
        .map(|(mode, &q)| match mode {
            LinkMode::Inactive => 0.0,
            LinkMode::Fixed(f) | LinkMode::Anchored { flow: f, .. } => *f,
            LinkMode::Conduct(_) => q / SECONDS_PER_HOUR,
        })
        .collect();
    Ok(InitialState { heads, flows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Controls, NewtonConfig};
    use hn_core::units::{m, mm};
    use hn_network::NetworkBuilder;

    #[test]
    fn tree_flows_carry_subtree_demand() {
        // R -> A -> B, with B -> C declared against the flow direction.
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 40.0);
        b.add_junction("A", 0.0, 0.0);
        b.add_junction("B", 0.0, 0.0);
        b.add_junction("C", 0.0, 0.0);
        b.add_pipe("P1", "R", "A", m(100.0), mm(200.0), 120.0, 0.0);
        b.add_pipe("P2", "A", "B", m(100.0), mm(200.0), 120.0, 0.0);
        b.add_pipe("P3", "C", "B", m(100.0), mm(200.0), 120.0, 0.0);
        let net = b.build().unwrap();

        let demands = [0.0, 36.0, 72.0, 108.0];
        let problem =
            HydraulicProblem::new(&net, &demands, &Controls::new(), &NewtonConfig::default()).unwrap();
        let guess = initial_guess(&problem);

        assert!((guess.flows[0] - 0.06).abs() < 1e-12);
        assert!((guess.flows[1] - 0.05).abs() < 1e-12);
        assert!((guess.flows[2] + 0.03).abs() < 1e-12);
        assert!(guess.heads.iter().all(|h| *h == 40.0));
    }
}
