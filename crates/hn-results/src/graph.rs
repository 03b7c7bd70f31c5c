//! One-way export of a network for graph-database mirroring.

use std::fmt::Write;

use hn_network::{LinkKind, NetworkModel};
use serde::{Deserialize, Serialize};

use crate::types::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: String,
    pub elevation_m: f64,
    pub base_demand_m3h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: String,
    pub length_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_m3h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    pub topology_version: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphProjection {
    pub fn from_network(network: &NetworkModel) -> Self {
        let nodes = network
            .nodes()
            .iter()
            .map(|n| GraphNode {
                id: n.name.clone(),
                kind: n.kind.label().to_string(),
                elevation_m: n.elevation_m,
                base_demand_m3h: n.base_demand_m3h(),
                x: n.coordinates.map(|c| c.0),
                y: n.coordinates.map(|c| c.1),
                pressure_m: None,
            })
            .collect();
        let edges = network
            .links()
            .iter()
            .map(|l| GraphEdge {
                id: l.name.clone(),
                from: network.nodes()[l.from.idx()].name.clone(),
                to: network.nodes()[l.to.idx()].name.clone(),
                kind: l.kind.label().to_string(),
                length_m: l.length_m(),
                diameter_m: match &l.kind {
                    LinkKind::Pipe(p) => Some(p.diameter_m),
                    LinkKind::Valve(v) => Some(v.diameter_m),
                    LinkKind::Pump(_) => None,
                },
                flow_m3h: None,
            })
            .collect();
        Self {
            topology_version: network.topology_version(),
            nodes,
            edges,
        }
    }

    /// Attach pressures and flows from one period.
    pub fn with_snapshot(mut self, snapshot: &Snapshot) -> Self {
        for node in &mut self.nodes {
            node.pressure_m = snapshot.pressure_m(&node.id);
        }
        for edge in &mut self.edges {
            edge.flow_m3h = snapshot.flow_m3h(&edge.id);
        }
        self
    }

    /// Idempotent Cypher `MERGE` statements, one per line.
    pub fn to_cypher(&self) -> String {
        let mut out = String::new();
        for n in &self.nodes {
            let _ = write!(
                out,
                "MERGE (n:Node {{id: {}}}) SET n.kind = {}, n.elevation_m = {}, n.base_demand_m3h = {}",
                quote(&n.id),
                quote(&n.kind),
                n.elevation_m,
                n.base_demand_m3h
            );
            if let (Some(x), Some(y)) = (n.x, n.y) {
                let _ = write!(out, ", n.x = {x}, n.y = {y}");
            }
            if let Some(p) = n.pressure_m {
                let _ = write!(out, ", n.pressure_m = {p}");
            }
            out.push_str(";\n");
        }
        for e in &self.edges {
            let _ = write!(
                out,
                "MATCH (a:Node {{id: {}}}), (b:Node {{id: {}}}) MERGE (a)-[r:LINK {{id: {}}}]->(b) SET r.kind = {}, r.length_m = {}",
                quote(&e.from),
                quote(&e.to),
                quote(&e.id),
                quote(&e.kind),
                e.length_m
            );
            if let Some(d) = e.diameter_m {
                let _ = write!(out, ", r.diameter_m = {d}");
            }
            if let Some(q) = e.flow_m3h {
                let _ = write!(out, ", r.flow_m3h = {q}");
            }
            out.push_str(";\n");
        }
        out
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("O'Brien"), r"'O\'Brien'");
    }
}
