//! Network validation logic.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use hn_core::{LinkId, NodeId};

use crate::builder::PendingLink;
use crate::error::{DisconnectedNetworkError, NetworkResult, TopologyError};
use crate::model::{Link, Node, NodeKind, Pattern};

/// Node, link and pattern ids must be unique within their kind.
pub(crate) fn validate_ids(
    nodes: &[Node],
    links: &[PendingLink],
    patterns: &[(String, Pattern)],
) -> NetworkResult<()> {
    check_unique("node", nodes.iter().map(|n| n.name.as_str()))?;
    check_unique("link", links.iter().map(|l| l.name.as_str()))?;
    check_unique("pattern", patterns.iter().map(|(name, _)| name.as_str()))?;
    Ok(())
}

fn check_unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> NetworkResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TopologyError::DuplicateId {
                kind,
                id: name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn invalid(id: &str, field: &'static str, value: f64) -> TopologyError {
    TopologyError::InvalidValue {
        id: id.to_string(),
        field,
        value,
    }
}

/// Finite elevations and coordinates, non-negative demands, consistent tanks.
pub(crate) fn validate_values(nodes: &[Node], patterns: &[(String, Pattern)]) -> NetworkResult<()> {
    for node in nodes {
        if !node.elevation_m.is_finite() {
            return Err(invalid(&node.name, "elevation", node.elevation_m).into());
        }
        if let Some((x, y)) = node.coordinates {
            if !x.is_finite() {
                return Err(invalid(&node.name, "x coordinate", x).into());
            }
            if !y.is_finite() {
                return Err(invalid(&node.name, "y coordinate", y).into());
            }
        }
        match &node.kind {
            NodeKind::Junction {
                base_demand_m3h, ..
            } => {
                if !base_demand_m3h.is_finite() || *base_demand_m3h < 0.0 {
                    return Err(invalid(&node.name, "demand", *base_demand_m3h).into());
                }
            }
            NodeKind::Tank(t) => {
                if !t.diameter_m.is_finite() || t.diameter_m <= 0.0 {
                    return Err(invalid(&node.name, "tank diameter", t.diameter_m).into());
                }
                if !t.min_level_m.is_finite() || t.min_level_m < 0.0 {
                    return Err(invalid(&node.name, "tank min level", t.min_level_m).into());
                }
                if !t.max_level_m.is_finite() || t.max_level_m < t.min_level_m {
                    return Err(invalid(&node.name, "tank max level", t.max_level_m).into());
                }
                if !t.initial_level_m.is_finite()
                    || t.initial_level_m < t.min_level_m
                    || t.initial_level_m > t.max_level_m
                {
                    return Err(invalid(&node.name, "tank initial level", t.initial_level_m).into());
                }
            }
            NodeKind::Reservoir { .. } | NodeKind::PumpStation => {}
        }
    }

    for (name, pattern) in patterns {
        if pattern.multipliers.is_empty() {
            return Err(invalid(name, "pattern length", 0.0).into());
        }
        if let Some(&bad) = pattern
            .multipliers
            .iter()
            .find(|m| !m.is_finite() || **m < 0.0)
        {
            return Err(invalid(name, "pattern multiplier", bad).into());
        }
    }
    Ok(())
}

/// Resolve endpoint names and surface element construction errors.
pub(crate) fn resolve_links(
    pending: Vec<PendingLink>,
    node_by_name: &HashMap<String, NodeId>,
) -> NetworkResult<Vec<Link>> {
    let mut links = Vec::with_capacity(pending.len());
    for (i, p) in pending.into_iter().enumerate() {
        let lookup = |name: &str| {
            node_by_name
                .get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownNode {
                    link: p.name.clone(),
                    node: name.to_string(),
                })
        };
        let from = lookup(&p.from)?;
        let to = lookup(&p.to)?;
        if from == to {
            return Err(TopologyError::SelfLoop {
                link: p.name,
                node: p.from,
            }
            .into());
        }
        let kind = p.kind.map_err(|source| TopologyError::InvalidLink {
            link: p.name.clone(),
            source,
        })?;
        links.push(Link {
            id: LinkId::from_usize(i),
            name: p.name,
            from,
            to,
            kind,
        });
    }
    Ok(links)
}

/// Every referenced pattern must exist.
pub(crate) fn validate_patterns(
    nodes: &[Node],
    patterns: &BTreeMap<String, Pattern>,
) -> NetworkResult<()> {
    for node in nodes {
        let referenced = match &node.kind {
            NodeKind::Junction { pattern, .. } => pattern.as_deref(),
            NodeKind::Reservoir { head_pattern } => head_pattern.as_deref(),
            _ => None,
        };
        if let Some(name) = referenced {
            if !patterns.contains_key(name) {
                return Err(TopologyError::UnknownPattern {
                    node: node.name.clone(),
                    pattern: name.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_sources(nodes: &[Node]) -> NetworkResult<()> {
    if nodes.iter().any(Node::is_source) {
        Ok(())
    } else {
        Err(TopologyError::NoSource.into())
    }
}

/// Breadth-first reachability from all sources over every link.
pub(crate) fn validate_connectivity(
    nodes: &[Node],
    links: &[Link],
    offsets: &[usize],
    node_links: &[LinkId],
) -> NetworkResult<()> {
    let mut seen = vec![false; nodes.len()];
    let mut queue = VecDeque::new();
    for node in nodes.iter().filter(|n| n.is_source()) {
        seen[node.id.idx()] = true;
        queue.push_back(node.id);
    }
    while let Some(n) = queue.pop_front() {
        for lid in &node_links[offsets[n.idx()]..offsets[n.idx() + 1]] {
            let other = links[lid.idx()].other(n);
            if !seen[other.idx()] {
                seen[other.idx()] = true;
                queue.push_back(other);
            }
        }
    }

    let unreachable: Vec<String> = nodes
        .iter()
        .filter(|n| !seen[n.id.idx()])
        .map(|n| n.name.clone())
        .collect();
    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(DisconnectedNetworkError { unreachable }.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{NetworkError, TopologyError};
    use crate::model::TankSpec;
    use crate::NetworkBuilder;
    use hn_core::units::{m, mm};

    fn pipe(b: &mut NetworkBuilder, name: &str, from: &str, to: &str) {
        b.add_pipe(name, from, to, m(100.0), mm(150.0), 120.0, 0.0);
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("R", 0.0, 0.0);
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::DuplicateId { kind: "node", .. }))
        ));
    }

    #[test]
    fn duplicate_link_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("J", 0.0, 0.0);
        pipe(&mut b, "P", "R", "J");
        pipe(&mut b, "P", "J", "R");
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::DuplicateId { kind: "link", .. }))
        ));
    }

    #[test]
    fn dangling_endpoint_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        pipe(&mut b, "P", "R", "nowhere");
        match b.build() {
            Err(NetworkError::Topology(TopologyError::UnknownNode { link, node })) => {
                assert_eq!(link, "P");
                assert_eq!(node, "nowhere");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn self_loop_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        pipe(&mut b, "P", "R", "R");
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::SelfLoop { .. }))
        ));
    }

    #[test]
    fn negative_demand_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("J", 0.0, -1.0);
        pipe(&mut b, "P", "R", "J");
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::InvalidValue { field: "demand", .. }))
        ));
    }

    #[test]
    fn bad_tank_levels_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_tank(
            "T",
            10.0,
            TankSpec {
                initial_level_m: 5.0,
                min_level_m: 0.0,
                max_level_m: 4.0,
                diameter_m: 10.0,
            },
        );
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn bad_pipe_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("J", 0.0, 1.0);
        b.add_pipe("P", "R", "J", m(100.0), mm(0.0), 120.0, 0.0);
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::InvalidLink { .. }))
        ));
    }

    #[test]
    fn unknown_pattern_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        let j = b.add_junction("J", 0.0, 1.0);
        b.set_pattern(j, "missing");
        pipe(&mut b, "P", "R", "J");
        assert!(matches!(
            b.build(),
            Err(NetworkError::Topology(TopologyError::UnknownPattern { .. }))
        ));
    }

    #[test]
    fn no_source_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_junction("A", 0.0, 1.0);
        b.add_junction("B", 0.0, 1.0);
        pipe(&mut b, "P", "A", "B");
        assert_eq!(b.build().unwrap_err(), NetworkError::Topology(TopologyError::NoSource));
    }

    #[test]
    fn unreachable_nodes_named() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("A", 0.0, 1.0);
        b.add_junction("B", 0.0, 1.0);
        b.add_junction("C", 0.0, 1.0);
        pipe(&mut b, "P1", "R", "A");
        pipe(&mut b, "P2", "B", "C");
        match b.build() {
            Err(NetworkError::Disconnected(e)) => assert_eq!(e.unreachable, vec!["B", "C"]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
