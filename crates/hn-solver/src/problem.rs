//! Problem definition for a single steady-state solve.

use hn_components::{ElementSettings, ValveStatus};
use hn_core::units::SECONDS_PER_HOUR;
use hn_network::{HeadIndex, LinkKind, NetworkModel, NodeKind, SourceOrder};

use crate::controls::{Controls, PumpState};
use crate::error::{SolverError, SolverResult};
use crate::newton::NewtonConfig;

/// How a link takes part in one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkMode {
    /// Closed valve or stopped pump: out of the system.
    Inactive,
    /// Flow follows the element's head-loss law.
    Conduct(ElementSettings),
    /// Flow fixed at the given value (m³/s).
    Fixed(f64),
    /// Fixed-flow pump that is the only head path to the nodes behind it.
    /// It follows the tangent of its curve at the setpoint `flow` (m³/s), so
    /// it carries the setpoint whenever the nodes it feeds are in balance.
    Anchored { flow: f64, settings: ElementSettings },
}

impl LinkMode {
    /// True when the link ties the heads of its two ends together.
    pub fn carries_head(&self) -> bool {
        matches!(self, LinkMode::Conduct(_) | LinkMode::Anchored { .. })
    }
}

/// A network together with the demands and controls of one solve.
///
/// Construction resolves controls into link modes, fixes source heads and
/// checks that every free node still hangs off a source through
/// head-carrying links. Nodes reachable only across fixed-flow pumps take
/// their head from the first such pump in declaration order.
#[derive(Debug, Clone)]
pub struct HydraulicProblem<'a> {
    pub network: &'a NetworkModel,
    /// Nodal demand (m³/s), indexed by node.
    pub demands: Vec<f64>,
    /// Total head (m) at fixed-head nodes, indexed by node.
    pub fixed_heads: Vec<Option<f64>>,
    /// Mode per link, indexed by link.
    pub modes: Vec<LinkMode>,
    /// Matrix rows for free-head nodes.
    pub index: HeadIndex,
    /// Breadth-first order over head-conducting links.
    pub order: SourceOrder,
}

impl<'a> HydraulicProblem<'a> {
    pub fn new(
        network: &'a NetworkModel,
        demands_m3h: &[f64],
        controls: &Controls,
        config: &NewtonConfig,
    ) -> SolverResult<Self> {
        config.validate()?;
        let nodes = network.nodes();

        if demands_m3h.len() != nodes.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "demand vector has {} entries, network has {} nodes",
                    demands_m3h.len(),
                    nodes.len()
                ),
            });
        }
        let mut demands = Vec::with_capacity(nodes.len());
        for (node, &d) in nodes.iter().zip(demands_m3h) {
            if !d.is_finite() || d < 0.0 {
                return Err(SolverError::ProblemSetup {
                    what: format!("demand at '{}' must be finite and non-negative, got {d}", node.name),
                });
            }
            demands.push(if node.is_source() { 0.0 } else { d / SECONDS_PER_HOUR });
        }

        let mut fixed_heads = vec![None; nodes.len()];
        for node in nodes {
            let declared = match &node.kind {
                NodeKind::Tank(t) => Some(node.elevation_m + t.initial_level_m),
                NodeKind::Reservoir { .. } => Some(node.elevation_m),
                _ => None,
            };
            let head = match (declared, controls.source_heads.get(&node.id)) {
                (Some(_), Some(&h)) => Some(h),
                (declared, None) => declared,
                (None, Some(_)) => {
                    return Err(SolverError::ProblemSetup {
                        what: format!("head override on non-source node '{}'", node.name),
                    });
                }
            };
            if let Some(h) = head {
                if !h.is_finite() {
                    return Err(SolverError::ProblemSetup {
                        what: format!("head at '{}' is not finite", node.name),
                    });
                }
            }
            fixed_heads[node.id.idx()] = head;
        }

        let base = ElementSettings {
            exponent: config.exponent,
            ..ElementSettings::default()
        };
        let mut modes = Vec::with_capacity(network.links().len());
        for link in network.links() {
            let mode = match &link.kind {
                LinkKind::Pipe(_) => LinkMode::Conduct(base),
                LinkKind::Valve(v) => match controls.valve_status(link.id, v.initial_status) {
                    ValveStatus::Open => LinkMode::Conduct(base),
                    ValveStatus::Closed => LinkMode::Inactive,
                },
                LinkKind::Pump(_) => match controls.pump_state(link.id) {
                    PumpState::Off => LinkMode::Inactive,
                    PumpState::On { speed } => {
                        if !speed.is_finite() || speed < 0.0 {
                            return Err(SolverError::ProblemSetup {
                                what: format!("pump '{}' speed must be non-negative, got {speed}", link.name),
                            });
                        }
                        if speed == 0.0 {
                            LinkMode::Inactive
                        } else {
                            LinkMode::Conduct(ElementSettings { speed, ..base })
                        }
                    }
                    PumpState::FlowSetpoint { flow_m3h } => {
                        if !flow_m3h.is_finite() || flow_m3h < 0.0 {
                            return Err(SolverError::ProblemSetup {
                                what: format!(
                                    "pump '{}' setpoint must be non-negative, got {flow_m3h}",
                                    link.name
                                ),
                            });
                        }
                        LinkMode::Fixed(flow_m3h / SECONDS_PER_HOUR)
                    }
                },
            };
            modes.push(mode);
        }

        let mut order = network.topological_order_with(|l| modes[l.idx()].carries_head());
        loop {
            let bridge = network.links().iter().find(|link| {
                matches!(modes[link.id.idx()], LinkMode::Fixed(_))
                    && order.reached[link.from.idx()] != order.reached[link.to.idx()]
            });
            let Some(link) = bridge else { break };
            if let LinkMode::Fixed(flow) = modes[link.id.idx()] {
                tracing::debug!(pump = %link.name, "fixed-flow pump anchors downstream heads");
                modes[link.id.idx()] = LinkMode::Anchored { flow, settings: base };
            }
            order = network.topological_order_with(|l| modes[l.idx()].carries_head());
        }
        let isolated: Vec<String> = nodes
            .iter()
            .filter(|n| !order.reached[n.id.idx()])
            .map(|n| n.name.clone())
            .collect();
        if !isolated.is_empty() {
            return Err(SolverError::IsolatedByControls { nodes: isolated });
        }

        Ok(Self {
            network,
            demands,
            fixed_heads,
            modes,
            index: HeadIndex::from_network(network),
            order,
        })
    }

    /// Current head of a node: fixed value or the free-head estimate.
    pub fn head(&self, node: hn_core::NodeId, free_heads: &[f64]) -> f64 {
        match self.fixed_heads[node.idx()] {
            Some(h) => h,
            None => self
                .index
                .row(node)
                .map_or(f64::NAN, |row| free_heads[row]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_components::PumpCurve;
    use hn_core::units::{m, mm};
    use hn_network::NetworkBuilder;

    fn net() -> NetworkModel {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("A", 0.0, 5.0);
        b.add_junction("B", 0.0, 5.0);
        b.add_pump("PU", "R", "A", PumpCurve::single_point(50.0, 30.0));
        b.add_valve("V", "A", "B", mm(100.0), 0.2, ValveStatus::Open);
        b.build().unwrap()
    }

    #[test]
    fn demand_length_checked() {
        let net = net();
        let err = HydraulicProblem::new(&net, &[0.0], &Controls::new(), &NewtonConfig::default())
            .unwrap_err();
        assert!(matches!(err, SolverError::ProblemSetup { .. }));
    }

    #[test]
    fn negative_demand_rejected() {
        let net = net();
        let err = HydraulicProblem::new(
            &net,
            &[0.0, -1.0, 0.0],
            &Controls::new(),
            &NewtonConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn closed_valve_isolates_downstream() {
        let net = net();
        let v = net.link_id("V").unwrap();
        let controls = Controls::new().with_valve(v, ValveStatus::Closed);
        let err = HydraulicProblem::new(&net, &[0.0, 5.0, 5.0], &controls, &NewtonConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::IsolatedByControls {
                nodes: vec!["B".into()]
            }
        );
    }

    #[test]
    fn setpoint_pump_on_only_feed_anchors_heads() {
        let net = net();
        let pu = net.link_id("PU").unwrap();
        let controls = Controls::new().with_pump(pu, PumpState::FlowSetpoint { flow_m3h: 10.0 });
        let p = HydraulicProblem::new(&net, &[0.0, 5.0, 5.0], &controls, &NewtonConfig::default())
            .unwrap();
        assert!(matches!(p.modes[pu.idx()], LinkMode::Anchored { .. }));
        assert!(p.order.reached.iter().all(|&r| r));
    }

    #[test]
    fn setpoint_pump_beside_a_feed_stays_fixed() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 10.0);
        b.add_junction("A", 0.0, 5.0);
        b.add_pump("PU", "R", "A", PumpCurve::single_point(50.0, 30.0));
        b.add_pipe("P", "R", "A", m(100.0), mm(150.0), 120.0, 0.0);
        let net = b.build().unwrap();
        let pu = net.link_id("PU").unwrap();
        let controls = Controls::new().with_pump(pu, PumpState::FlowSetpoint { flow_m3h: 10.0 });
        let p = HydraulicProblem::new(&net, &[0.0, 5.0], &controls, &NewtonConfig::default())
            .unwrap();
        assert_eq!(p.modes[pu.idx()], LinkMode::Fixed(10.0 / 3600.0));
    }

    #[test]
    fn closed_valve_behind_setpoint_pump_still_isolates() {
        let net = net();
        let pu = net.link_id("PU").unwrap();
        let v = net.link_id("V").unwrap();
        let controls = Controls::new()
            .with_pump(pu, PumpState::FlowSetpoint { flow_m3h: 10.0 })
            .with_valve(v, ValveStatus::Closed);
        let err = HydraulicProblem::new(&net, &[0.0, 5.0, 5.0], &controls, &NewtonConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::IsolatedByControls {
                nodes: vec!["B".into()]
            }
        );
    }

    #[test]
    fn modes_resolved() {
        let net = net();
        let p = HydraulicProblem::new(
            &net,
            &[0.0, 3600.0, 0.0],
            &Controls::new(),
            &NewtonConfig::default(),
        )
        .unwrap();
        assert!(matches!(p.modes[0], LinkMode::Conduct(_)));
        assert_eq!(p.demands[1], 1.0);
        assert_eq!(p.fixed_heads[0], Some(10.0));
        assert_eq!(p.index.len(), 2);
    }
}
