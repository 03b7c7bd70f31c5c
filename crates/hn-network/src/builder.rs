//! Incremental network builder.

use std::collections::{BTreeMap, HashMap};

use hn_components::{ComponentResult, Pipe, Pump, PumpCurve, Valve, ValveStatus};
use hn_core::units::Length;
use hn_core::{LinkId, NodeId};
use petgraph::graph::UnGraph;

use crate::error::NetworkResult;
use crate::model::{Link, LinkKind, NetworkModel, Node, NodeKind, Pattern, TankSpec};
use crate::validate;

/// A link whose endpoints are still names and whose element may have
/// failed construction. Resolved and checked in `build()`.
#[derive(Debug, Clone)]
pub(crate) struct PendingLink {
    pub name: String,
    pub from: String,
    pub to: String,
    pub kind: ComponentResult<LinkKind>,
}

/// Builder for constructing a network incrementally.
///
/// Nodes and links are referenced by their string ids. Nothing is checked
/// until `build()`, which validates the whole description and freezes it
/// into an immutable `NetworkModel`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    pub(crate) title: Option<String>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<PendingLink>,
    pub(crate) patterns: Vec<(String, Pattern)>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Add a node of any kind and return its id.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind, elevation_m: f64) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(Node {
            id,
            name: name.into(),
            kind,
            elevation_m,
            coordinates: None,
        });
        id
    }

    /// Junction with a constant base demand (m³/h).
    pub fn add_junction(&mut self, name: impl Into<String>, elevation_m: f64, demand_m3h: f64) -> NodeId {
        self.add_node(
            name,
            NodeKind::Junction {
                base_demand_m3h: demand_m3h,
                pattern: None,
            },
            elevation_m,
        )
    }

    /// Reservoir with fixed total head (m).
    pub fn add_reservoir(&mut self, name: impl Into<String>, head_m: f64) -> NodeId {
        self.add_node(name, NodeKind::Reservoir { head_pattern: None }, head_m)
    }

    pub fn add_tank(&mut self, name: impl Into<String>, elevation_m: f64, tank: TankSpec) -> NodeId {
        self.add_node(name, NodeKind::Tank(tank), elevation_m)
    }

    pub fn add_pump_station(&mut self, name: impl Into<String>, elevation_m: f64) -> NodeId {
        self.add_node(name, NodeKind::PumpStation, elevation_m)
    }

    /// Attach a demand (or head) pattern to a previously added node.
    pub fn set_pattern(&mut self, node: NodeId, pattern: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node.idx()) {
            match &mut n.kind {
                NodeKind::Junction { pattern: p, .. } => *p = Some(pattern.into()),
                NodeKind::Reservoir { head_pattern } => *head_pattern = Some(pattern.into()),
                _ => {}
            }
        }
    }

    pub fn set_coordinates(&mut self, node: NodeId, x: f64, y: f64) {
        if let Some(n) = self.nodes.get_mut(node.idx()) {
            n.coordinates = Some((x, y));
        }
    }

    /// Look up a node added so far by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Add a link with an already constructed element.
    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: ComponentResult<LinkKind>,
    ) -> LinkId {
        let id = LinkId::from_usize(self.links.len());
        self.links.push(PendingLink {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            kind,
        });
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        length: Length,
        diameter: Length,
        roughness: f64,
        minor_loss: f64,
    ) -> LinkId {
        let kind = Pipe::new(length, diameter, roughness, minor_loss).map(LinkKind::Pipe);
        self.add_link(name, from, to, kind)
    }

    pub fn add_pump(
        &mut self,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        curve: ComponentResult<PumpCurve>,
    ) -> LinkId {
        let kind = curve.map(|c| LinkKind::Pump(Pump::new(c)));
        self.add_link(name, from, to, kind)
    }

    pub fn add_valve(
        &mut self,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        diameter: Length,
        minor_loss: f64,
        status: ValveStatus,
    ) -> LinkId {
        let kind = Valve::new(diameter, minor_loss, status).map(LinkKind::Valve);
        self.add_link(name, from, to, kind)
    }

    pub fn add_pattern(&mut self, name: impl Into<String>, multipliers: Vec<f64>) {
        self.patterns.push((name.into(), Pattern { multipliers }));
    }

    /// Validate and freeze the description.
    ///
    /// Rejects on the first inconsistency: duplicate ids, bad values,
    /// dangling or self-looping links, invalid elements, unknown patterns,
    /// no source, and finally nodes unreachable from every source.
    pub fn build(self) -> NetworkResult<NetworkModel> {
        validate::validate_ids(&self.nodes, &self.links, &self.patterns)?;
        validate::validate_values(&self.nodes, &self.patterns)?;

        let node_by_name: HashMap<String, NodeId> =
            self.nodes.iter().map(|n| (n.name.clone(), n.id)).collect();
        let links = validate::resolve_links(self.links, &node_by_name)?;
        let patterns: BTreeMap<String, Pattern> = self.patterns.into_iter().collect();
        validate::validate_patterns(&self.nodes, &patterns)?;
        validate::validate_sources(&self.nodes)?;

        let (node_link_offsets, node_links) = Self::build_adjacency(self.nodes.len(), &links);
        validate::validate_connectivity(&self.nodes, &links, &node_link_offsets, &node_links)?;

        let link_by_name = links.iter().map(|l| (l.name.clone(), l.id)).collect();
        let graph = Self::build_graph(&self.nodes, &links);

        Ok(NetworkModel {
            nodes: self.nodes,
            links,
            patterns,
            title: self.title,
            node_by_name,
            link_by_name,
            node_link_offsets,
            node_links,
            graph,
        })
    }

    /// Compact adjacency: for each node, its incident links sorted by id.
    fn build_adjacency(node_count: usize, links: &[Link]) -> (Vec<usize>, Vec<LinkId>) {
        let mut per_node: Vec<Vec<LinkId>> = vec![Vec::new(); node_count];
        for link in links {
            per_node[link.from.idx()].push(link.id);
            per_node[link.to.idx()].push(link.id);
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut flat = Vec::with_capacity(links.len() * 2);
        offsets.push(0);
        for list in per_node {
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }

    fn build_graph(nodes: &[Node], links: &[Link]) -> UnGraph<NodeId, LinkId> {
        let mut graph = UnGraph::with_capacity(nodes.len(), links.len());
        let indices: Vec<_> = nodes.iter().map(|n| graph.add_node(n.id)).collect();
        for link in links {
            graph.add_edge(indices[link.from.idx()], indices[link.to.idx()], link.id);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_core::units::{m, mm};

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut builder = NetworkBuilder::new();
        let r = builder.add_reservoir("R", 40.0);
        let j = builder.add_junction("J", 5.0, 10.0);
        let p = builder.add_pipe("P", "R", "J", m(100.0), mm(150.0), 120.0, 0.0);
        assert_eq!(r.index(), 0);
        assert_eq!(j.index(), 1);
        assert_eq!(p.index(), 0);
        assert_eq!(builder.find_node("J"), Some(j));
    }

    #[test]
    fn adjacency_is_sorted_and_complete() {
        let mut builder = NetworkBuilder::new();
        builder.add_reservoir("R", 40.0);
        builder.add_junction("A", 0.0, 1.0);
        builder.add_junction("B", 0.0, 1.0);
        builder.add_pipe("P1", "R", "A", m(100.0), mm(150.0), 120.0, 0.0);
        builder.add_pipe("P2", "A", "B", m(100.0), mm(150.0), 120.0, 0.0);
        builder.add_pipe("P3", "B", "R", m(100.0), mm(150.0), 120.0, 0.0);
        let net = builder.build().unwrap();

        let a = net.node_id("A").unwrap();
        let ids: Vec<u32> = net.incident_links(a).iter().map(|l| l.index()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(net.neighbors(a).len(), 2);
    }

    #[test]
    fn coordinates_and_patterns() {
        let mut builder = NetworkBuilder::new();
        builder.add_reservoir("R", 40.0);
        let j = builder.add_junction("J", 0.0, 10.0);
        builder.set_coordinates(j, 1.0, 2.0);
        builder.set_pattern(j, "day");
        builder.add_pattern("day", vec![0.5, 2.0]);
        builder.add_pipe("P", "R", "J", m(100.0), mm(150.0), 120.0, 0.0);
        let net = builder.build().unwrap();

        assert_eq!(net.node(j).unwrap().coordinates, Some((1.0, 2.0)));
        assert_eq!(net.demands_at(0)[j.idx()], 5.0);
        assert_eq!(net.demands_at(1)[j.idx()], 20.0);
    }
}
