//! Read-only traversal queries over a built network.

use std::collections::VecDeque;

use hn_core::{LinkId, NodeId};
use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use sha2::{Digest, Sha256};

use crate::model::{LinkKind, NetworkModel, NodeKind};

/// Edge weight used by `NetworkModel::path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMetric {
    /// Every link costs 1.
    #[default]
    LinkCount,
    /// Pipe length in m; pumps and valves cost 0.
    Length,
}

/// A shortest path between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
    pub cost: f64,
}

/// Breadth-first order from the sources with each node's discovering link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOrder {
    /// Visit order: sources first (declaration order), then discovery order.
    pub order: Vec<NodeId>,
    /// Parent link per node index; `None` for sources and unreached nodes.
    pub parent_link: Vec<Option<LinkId>>,
    /// Whether each node was reached.
    pub reached: Vec<bool>,
}

impl NetworkModel {
    fn link_cost(&self, link: LinkId, metric: PathMetric) -> f64 {
        match metric {
            PathMetric::LinkCount => 1.0,
            PathMetric::Length => self.links[link.idx()].length_m(),
        }
    }

    /// Shortest path from `a` to `b` under `metric`, or `None` if either id
    /// is unknown or no path exists.
    pub fn path(&self, a: NodeId, b: NodeId, metric: PathMetric) -> Option<PathResult> {
        if a.idx() >= self.nodes.len() || b.idx() >= self.nodes.len() {
            return None;
        }
        let start = NodeIndex::new(a.idx());
        let goal = NodeIndex::new(b.idx());
        let (cost, route) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| self.link_cost(*e.weight(), metric),
            |_| 0.0,
        )?;

        let nodes: Vec<NodeId> = route.iter().map(|ix| self.graph[*ix]).collect();
        let mut links = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            // Cheapest (then lowest id) of possibly parallel links.
            let best = self
                .incident_links(pair[0])
                .iter()
                .copied()
                .filter(|l| self.links[l.idx()].other(pair[0]) == pair[1])
                .min_by(|x, y| {
                    self.link_cost(*x, metric)
                        .total_cmp(&self.link_cost(*y, metric))
                        .then(x.cmp(y))
                })?;
            links.push(best);
        }
        Some(PathResult { nodes, links, cost })
    }

    /// Shortest path between nodes given by name.
    pub fn path_by_name(&self, a: &str, b: &str, metric: PathMetric) -> Option<PathResult> {
        self.path(self.node_id(a)?, self.node_id(b)?, metric)
    }

    /// Stable breadth-first order from the sources over every link.
    pub fn topological_order(&self) -> SourceOrder {
        self.topological_order_with(|_| true)
    }

    /// Breadth-first order from the sources over the links accepted by `active`.
    ///
    /// Sources are seeded in declaration order; neighbors are visited in link
    /// declaration order, so the result is fully deterministic.
    pub fn topological_order_with(&self, active: impl Fn(LinkId) -> bool) -> SourceOrder {
        let n = self.nodes.len();
        let mut order = Vec::with_capacity(n);
        let mut parent_link = vec![None; n];
        let mut reached = vec![false; n];
        let mut queue = VecDeque::new();

        for src in self.sources() {
            reached[src.id.idx()] = true;
            order.push(src.id);
            queue.push_back(src.id);
        }
        while let Some(node) = queue.pop_front() {
            for &lid in self.incident_links(node) {
                if !active(lid) {
                    continue;
                }
                let other = self.links[lid.idx()].other(node);
                if !reached[other.idx()] {
                    reached[other.idx()] = true;
                    parent_link[other.idx()] = Some(lid);
                    order.push(other);
                    queue.push_back(other);
                }
            }
        }
        SourceOrder {
            order,
            parent_link,
            reached,
        }
    }

    /// SHA-256 over a canonical description of nodes, links and patterns.
    ///
    /// Any change to topology or to a physical parameter changes the version.
    pub fn topology_version(&self) -> String {
        let mut hasher = Sha256::new();
        for node in &self.nodes {
            let kind = match &node.kind {
                NodeKind::Junction {
                    base_demand_m3h,
                    pattern,
                } => format!("J:{base_demand_m3h}:{}", pattern.as_deref().unwrap_or("")),
                NodeKind::Tank(t) => format!(
                    "T:{}:{}:{}:{}",
                    t.initial_level_m, t.min_level_m, t.max_level_m, t.diameter_m
                ),
                NodeKind::Reservoir { head_pattern } => {
                    format!("R:{}", head_pattern.as_deref().unwrap_or(""))
                }
                NodeKind::PumpStation => "S".to_string(),
            };
            hasher.update(format!("node|{}|{}|{kind}\n", node.name, node.elevation_m));
        }
        for link in &self.links {
            let kind = match &link.kind {
                LinkKind::Pipe(p) => format!(
                    "P:{}:{}:{}:{}",
                    p.length_m, p.diameter_m, p.roughness, p.minor_loss
                ),
                LinkKind::Pump(p) => {
                    format!("U:{}:{}:{}", p.curve.shutoff_head, p.curve.r, p.curve.n)
                }
                LinkKind::Valve(v) => {
                    format!("V:{}:{}:{:?}", v.diameter_m, v.minor_loss, v.initial_status)
                }
            };
            let from = &self.nodes[link.from.idx()].name;
            let to = &self.nodes[link.to.idx()].name;
            hasher.update(format!("link|{}|{from}|{to}|{kind}\n", link.name));
        }
        for (name, pattern) in &self.patterns {
            hasher.update(format!("pattern|{name}|{:?}\n", pattern.multipliers));
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkBuilder;
    use hn_core::units::{m, mm};

    /// R - A - B - C with a long direct A - C shortcut.
    fn net() -> NetworkModel {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 50.0);
        b.add_junction("A", 0.0, 1.0);
        b.add_junction("B", 0.0, 1.0);
        b.add_junction("C", 0.0, 1.0);
        b.add_pipe("RA", "R", "A", m(10.0), mm(200.0), 120.0, 0.0);
        b.add_pipe("AB", "A", "B", m(100.0), mm(200.0), 120.0, 0.0);
        b.add_pipe("BC", "B", "C", m(100.0), mm(200.0), 120.0, 0.0);
        b.add_pipe("AC", "A", "C", m(1000.0), mm(200.0), 120.0, 0.0);
        b.build().unwrap()
    }

    #[test]
    fn path_by_link_count_takes_shortcut() {
        let net = net();
        let p = net.path_by_name("R", "C", PathMetric::LinkCount).unwrap();
        assert_eq!(p.cost, 2.0);
        assert_eq!(p.links, vec![net.link_id("RA").unwrap(), net.link_id("AC").unwrap()]);
    }

    #[test]
    fn path_by_length_avoids_long_pipe() {
        let net = net();
        let p = net.path_by_name("R", "C", PathMetric::Length).unwrap();
        assert!((p.cost - 210.0).abs() < 1e-9);
        assert_eq!(p.nodes.len(), 4);
    }

    #[test]
    fn path_to_self_is_empty() {
        let net = net();
        let a = net.node_id("A").unwrap();
        let p = net.path(a, a, PathMetric::LinkCount).unwrap();
        assert_eq!(p.nodes, vec![a]);
        assert!(p.links.is_empty());
    }

    #[test]
    fn order_is_breadth_first_from_sources() {
        let net = net();
        let order = net.topological_order();
        let names: Vec<&str> = order
            .order
            .iter()
            .map(|id| net.node(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["R", "A", "B", "C"]);
        let c = net.node_id("C").unwrap();
        assert_eq!(order.parent_link[c.idx()], net.link_id("AC"));
    }

    #[test]
    fn inactive_links_are_skipped() {
        let net = net();
        let ac = net.link_id("AC").unwrap();
        let order = net.topological_order_with(|l| l != ac);
        let c = net.node_id("C").unwrap();
        assert_eq!(order.parent_link[c.idx()], net.link_id("BC"));
    }

    #[test]
    fn version_is_stable_and_sensitive() {
        let a = net();
        assert_eq!(a.topology_version(), net().topology_version());
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 51.0);
        b.add_junction("A", 0.0, 1.0);
        b.add_pipe("RA", "R", "A", m(10.0), mm(200.0), 120.0, 0.0);
        assert_ne!(a.topology_version(), b.build().unwrap().topology_version());
        assert_eq!(a.topology_version().len(), 64);
    }
}
