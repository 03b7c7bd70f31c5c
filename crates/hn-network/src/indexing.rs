//! Stable indexing for solver integration.
//!
//! The head solve only has unknowns at free-head nodes (junctions and pump
//! stations). `HeadIndex` maps those nodes to contiguous matrix rows and
//! back.

use hn_core::NodeId;

use crate::model::NetworkModel;

#[derive(Debug, Clone)]
pub struct HeadIndex {
    /// Row -> node.
    free_nodes: Vec<NodeId>,
    /// Node index -> row; `None` for fixed-head nodes.
    node_to_row: Vec<Option<usize>>,
}

impl HeadIndex {
    /// Index the free-head nodes of a network in declaration order.
    pub fn from_network(network: &NetworkModel) -> Self {
        Self::with_filter(network, |_| true)
    }

    /// Index only the free-head nodes accepted by `keep`.
    pub fn with_filter(network: &NetworkModel, keep: impl Fn(NodeId) -> bool) -> Self {
        let mut free_nodes = Vec::new();
        let mut node_to_row = vec![None; network.nodes().len()];
        for node in network.nodes() {
            if !node.is_source() && keep(node.id) {
                node_to_row[node.id.idx()] = Some(free_nodes.len());
                free_nodes.push(node.id);
            }
        }
        Self {
            free_nodes,
            node_to_row,
        }
    }

    /// Number of unknown heads.
    pub fn len(&self) -> usize {
        self.free_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free_nodes.is_empty()
    }

    /// Matrix row of a node, if its head is unknown.
    pub fn row(&self, node: NodeId) -> Option<usize> {
        self.node_to_row.get(node.idx()).copied().flatten()
    }

    /// Node at a matrix row (panics if out of bounds).
    pub fn node(&self, row: usize) -> NodeId {
        self.free_nodes[row]
    }

    pub fn free_nodes(&self) -> &[NodeId] {
        &self.free_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkBuilder;
    use hn_core::units::{m, mm};

    #[test]
    fn sources_have_no_row() {
        let mut b = NetworkBuilder::new();
        let j1 = b.add_junction("J1", 0.0, 1.0);
        let r = b.add_reservoir("R", 30.0);
        let j2 = b.add_junction("J2", 0.0, 1.0);
        b.add_pipe("P1", "R", "J1", m(100.0), mm(150.0), 120.0, 0.0);
        b.add_pipe("P2", "J1", "J2", m(100.0), mm(150.0), 120.0, 0.0);
        let net = b.build().unwrap();

        let idx = HeadIndex::from_network(&net);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.row(j1), Some(0));
        assert_eq!(idx.row(j2), Some(1));
        assert_eq!(idx.row(r), None);
        assert_eq!(idx.node(1), j2);
    }

    #[test]
    fn filter_drops_rows() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 30.0);
        let j1 = b.add_junction("J1", 0.0, 1.0);
        let j2 = b.add_junction("J2", 0.0, 1.0);
        b.add_pipe("P1", "R", "J1", m(100.0), mm(150.0), 120.0, 0.0);
        b.add_pipe("P2", "J1", "J2", m(100.0), mm(150.0), 120.0, 0.0);
        let net = b.build().unwrap();

        let idx = HeadIndex::with_filter(&net, |n| n != j1);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.row(j2), Some(0));
        assert!(idx.row(j1).is_none());
    }
}
