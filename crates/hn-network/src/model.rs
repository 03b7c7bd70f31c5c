//! Core network data structures.

use std::collections::{BTreeMap, HashMap};

use hn_components::{HeadLossElement, Pipe, Pump, Valve};
use hn_core::{LinkId, NodeId};
use petgraph::graph::UnGraph;

/// Storage geometry and level limits of a tank (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankSpec {
    pub initial_level_m: f64,
    pub min_level_m: f64,
    pub max_level_m: f64,
    pub diameter_m: f64,
}

impl TankSpec {
    /// Plan area of the (cylindrical) tank in m².
    pub fn area_m2(&self) -> f64 {
        std::f64::consts::PI * self.diameter_m * self.diameter_m / 4.0
    }

    /// Clamp a level to the operating range.
    pub fn clamp_level(&self, level_m: f64) -> f64 {
        level_m.clamp(self.min_level_m, self.max_level_m)
    }
}

/// Hydraulic role of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Demand-consuming node with free head.
    Junction {
        base_demand_m3h: f64,
        pattern: Option<String>,
    },
    /// Storage with head = elevation + level.
    Tank(TankSpec),
    /// Infinite source with head = elevation, optionally scaled by a pattern.
    Reservoir { head_pattern: Option<String> },
    /// Free-head node without demand hosting pump links.
    PumpStation,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Junction { .. } => "junction",
            NodeKind::Tank(_) => "tank",
            NodeKind::Reservoir { .. } => "reservoir",
            NodeKind::PumpStation => "pump_station",
        }
    }
}

/// A node of the distribution network.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Elevation (m)
    pub elevation_m: f64,
    pub coordinates: Option<(f64, f64)>,
}

impl Node {
    /// Reservoirs and tanks fix the head at their node.
    pub fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Tank(_) | NodeKind::Reservoir { .. })
    }

    /// Base demand in m³/h (zero for non-junctions).
    pub fn base_demand_m3h(&self) -> f64 {
        match self.kind {
            NodeKind::Junction {
                base_demand_m3h, ..
            } => base_demand_m3h,
            _ => 0.0,
        }
    }

    /// Head at a source node under its initial state; `None` for free-head nodes.
    pub fn initial_head_m(&self) -> Option<f64> {
        match &self.kind {
            NodeKind::Tank(t) => Some(self.elevation_m + t.initial_level_m),
            NodeKind::Reservoir { .. } => Some(self.elevation_m),
            _ => None,
        }
    }
}

/// Physical element carried by a link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkKind {
    Pipe(Pipe),
    Pump(Pump),
    Valve(Valve),
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Pipe(_) => "pipe",
            LinkKind::Pump(_) => "pump",
            LinkKind::Valve(_) => "valve",
        }
    }
}

/// A link between two nodes. Positive flow runs `from` → `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: LinkKind,
}

impl Link {
    pub fn element(&self) -> &dyn HeadLossElement {
        match &self.kind {
            LinkKind::Pipe(p) => p,
            LinkKind::Pump(p) => p,
            LinkKind::Valve(v) => v,
        }
    }

    /// Physical length in m; pumps and valves count as zero.
    pub fn length_m(&self) -> f64 {
        match &self.kind {
            LinkKind::Pipe(p) => p.length_m,
            _ => 0.0,
        }
    }

    pub fn is_pump(&self) -> bool {
        matches!(self.kind, LinkKind::Pump(_))
    }

    pub fn is_valve(&self) -> bool {
        matches!(self.kind, LinkKind::Valve(_))
    }

    /// The endpoint opposite `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.from == node { self.to } else { self.from }
    }
}

/// Multipliers applied per period, repeating cyclically.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub multipliers: Vec<f64>,
}

impl Pattern {
    pub fn multiplier(&self, period: usize) -> f64 {
        if self.multipliers.is_empty() {
            return 1.0;
        }
        self.multipliers[period % self.multipliers.len()]
    }
}

/// The network: a validated, immutable collection of nodes and links.
///
/// Stores:
/// - nodes and links in vectors indexed by their ids
/// - compact adjacency: for each node, its incident links in declaration order
/// - an undirected petgraph mirror for path queries
#[derive(Debug, Clone)]
pub struct NetworkModel {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) patterns: BTreeMap<String, Pattern>,
    pub(crate) title: Option<String>,

    pub(crate) node_by_name: HashMap<String, NodeId>,
    pub(crate) link_by_name: HashMap<String, LinkId>,

    /// Node i's links are in node_links[node_link_offsets[i]..node_link_offsets[i+1]].
    pub(crate) node_link_offsets: Vec<usize>,
    pub(crate) node_links: Vec<LinkId>,

    pub(crate) graph: UnGraph<NodeId, LinkId>,
}

impl NetworkModel {
    /// Validate and freeze a network description.
    pub fn build(topology: crate::NetworkBuilder) -> crate::NetworkResult<Self> {
        topology.build()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.idx())
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(name).copied()
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_by_name.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_id(name).and_then(|id| self.node(id))
    }

    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.link_id(name).and_then(|id| self.link(id))
    }

    pub fn patterns(&self) -> &BTreeMap<String, Pattern> {
        &self.patterns
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Source nodes (reservoirs and tanks) in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_source())
    }

    /// Pump links in declaration order.
    pub fn pumps(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.is_pump())
    }

    /// Base nodal demands (m³/h), indexed by node.
    pub fn base_demands(&self) -> Vec<f64> {
        self.nodes.iter().map(Node::base_demand_m3h).collect()
    }

    /// Nodal demands (m³/h) for a period, with junction patterns applied.
    pub fn demands_at(&self, period: usize) -> Vec<f64> {
        self.nodes
            .iter()
            .map(|n| match &n.kind {
                NodeKind::Junction {
                    base_demand_m3h,
                    pattern,
                } => {
                    let mult = pattern
                        .as_deref()
                        .and_then(|p| self.patterns.get(p))
                        .map_or(1.0, |p| p.multiplier(period));
                    base_demand_m3h * mult
                }
                _ => 0.0,
            })
            .collect()
    }

    /// Reservoir head (m) for a period, with the head pattern applied.
    pub fn reservoir_head_at(&self, node: &Node, period: usize) -> Option<f64> {
        match &node.kind {
            NodeKind::Reservoir { head_pattern } => {
                let mult = head_pattern
                    .as_deref()
                    .and_then(|p| self.patterns.get(p))
                    .map_or(1.0, |p| p.multiplier(period));
                Some(node.elevation_m * mult)
            }
            _ => None,
        }
    }

    /// Links incident to a node, in declaration order.
    pub fn incident_links(&self, node: NodeId) -> &[LinkId] {
        let idx = node.idx();
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.node_links[self.node_link_offsets[idx]..self.node_link_offsets[idx + 1]]
    }

    /// Adjacent nodes, in order of first connecting link; parallel links
    /// contribute a single neighbor.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        for &lid in self.incident_links(node) {
            let other = self.links[lid.idx()].other(node);
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_wraps() {
        let p = Pattern {
            multipliers: vec![0.5, 1.0, 1.5],
        };
        assert_eq!(p.multiplier(0), 0.5);
        assert_eq!(p.multiplier(4), 1.0);
    }

    #[test]
    fn tank_area_and_clamp() {
        let t = TankSpec {
            initial_level_m: 2.0,
            min_level_m: 0.5,
            max_level_m: 4.0,
            diameter_m: 2.0,
        };
        assert!((t.area_m2() - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(t.clamp_level(10.0), 4.0);
        assert_eq!(t.clamp_level(0.0), 0.5);
    }
}
