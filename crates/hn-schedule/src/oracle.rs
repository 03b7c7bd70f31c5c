//! Hydraulic feasibility oracle.
//!
//! Runs the network solver with every scheduled pump forced to its flow
//! setpoint and reads the monitored pressures back. The period forecast is
//! spread over junctions in proportion to their base demand.

use hn_core::{LinkId, NodeId};
use hn_network::{NetworkModel, NodeKind};
use hn_solver::{Controls, NewtonConfig, PumpState, solve};

use crate::config::OptimizerConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::pressure::{LinearSurrogate, PressureModel};
use crate::types::{PressureBound, PumpSpec};

pub struct HydraulicOracle<'a> {
    network: &'a NetworkModel,
    pumps: Vec<LinkId>,
    monitored: Vec<NodeId>,
    bounds: Vec<PressureBound>,
    /// Fraction of the forecast drawn at each node, indexed by node.
    shares: Vec<f64>,
    solver: NewtonConfig,
    step_m3h: f64,
}

impl<'a> HydraulicOracle<'a> {
    pub fn new(
        network: &'a NetworkModel,
        pumps: &[PumpSpec],
        bounds: Vec<PressureBound>,
        config: &OptimizerConfig,
    ) -> ScheduleResult<Self> {
        if !(config.finite_difference_step_m3h > 0.0) {
            return Err(ScheduleError::invalid("finite difference step must be > 0"));
        }
        let pump_links = resolve_pumps(network, pumps)?;
        let monitored = bounds
            .iter()
            .map(|b| {
                network
                    .node_id(&b.node)
                    .ok_or_else(|| ScheduleError::invalid(format!("unknown monitored node '{}'", b.node)))
            })
            .collect::<ScheduleResult<Vec<_>>>()?;

        Ok(Self {
            network,
            pumps: pump_links,
            monitored,
            bounds,
            shares: demand_shares(network),
            solver: config.solver,
            step_m3h: config.finite_difference_step_m3h,
        })
    }

    fn controls(&self, period: usize, flows_m3h: &[f64]) -> Controls {
        let mut controls = Controls::new();
        for (&link, &flow_m3h) in self.pumps.iter().zip(flows_m3h) {
            controls = controls.with_pump(link, PumpState::FlowSetpoint { flow_m3h });
        }
        for node in self.network.sources() {
            if let Some(head) = self.network.reservoir_head_at(node, period) {
                controls = controls.with_source_head(node.id, head);
            }
        }
        controls
    }
}

impl PressureModel for HydraulicOracle<'_> {
    fn bounds(&self) -> &[PressureBound] {
        &self.bounds
    }

    fn predict(&self, period: usize, flows_m3h: &[f64], demand_m3h: f64) -> ScheduleResult<Vec<f64>> {
        if flows_m3h.len() != self.pumps.len() {
            return Err(ScheduleError::invalid(format!(
                "oracle built for {} pumps, got {} flows",
                self.pumps.len(),
                flows_m3h.len()
            )));
        }
        let demands: Vec<f64> = self.shares.iter().map(|s| s * demand_m3h).collect();
        let controls = self.controls(period, flows_m3h);
        let result = solve(self.network, &demands, &controls, &self.solver)?.require_converged()?;
        Ok(self.monitored.iter().map(|&n| result.pressure(n)).collect())
    }

    fn linearize(&self, period: usize, flows_m3h: &[f64], demand_m3h: f64) -> ScheduleResult<LinearSurrogate> {
        let h = self.step_m3h;
        let p0 = self.predict(period, flows_m3h, demand_m3h)?;

        let mut sensitivity = vec![vec![0.0; flows_m3h.len()]; p0.len()];
        let mut probe = flows_m3h.to_vec();
        for k in 0..flows_m3h.len() {
            probe[k] += h;
            let pk = self.predict(period, &probe, demand_m3h)?;
            probe[k] -= h;
            for (i, row) in sensitivity.iter_mut().enumerate() {
                row[k] = (pk[i] - p0[i]) / h;
            }
        }
        let pd = self.predict(period, flows_m3h, demand_m3h + h)?;
        let demand_sensitivity: Vec<f64> = pd.iter().zip(&p0).map(|(a, b)| (a - b) / h).collect();

        let base = p0
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let pumped: f64 = sensitivity[i].iter().zip(flows_m3h).map(|(b, q)| b * q).sum();
                p - pumped - demand_sensitivity[i] * demand_m3h
            })
            .collect();
        tracing::debug!(period, nodes = p0.len(), "pressure model re-linearized");
        LinearSurrogate::new(self.bounds.clone(), base, sensitivity, demand_sensitivity)
    }

    fn fingerprint(&self) -> String {
        let mut out = format!("oracle|{}|{:x}|{:?}", self.network.topology_version(), self.step_m3h.to_bits(), self.solver);
        for link in &self.pumps {
            out.push_str(&format!("|p{}", link.index()));
        }
        for b in &self.bounds {
            out.push_str(&format!("|{}:{:x}:{:x}", b.node, b.min_m.to_bits(), b.max_m.to_bits()));
        }
        out
    }
}

/// Pump link ids for the specs, in request order.
pub fn resolve_pumps(network: &NetworkModel, pumps: &[PumpSpec]) -> ScheduleResult<Vec<LinkId>> {
    pumps
        .iter()
        .map(|spec| match network.link_by_name(&spec.id) {
            Some(link) if link.is_pump() => Ok(link.id),
            Some(_) => Err(ScheduleError::invalid(format!("link '{}' is not a pump", spec.id))),
            None => Err(ScheduleError::invalid(format!("unknown pump '{}'", spec.id))),
        })
        .collect()
}

/// Base-demand weights; uniform over junctions when no base demand is set.
fn demand_shares(network: &NetworkModel) -> Vec<f64> {
    let base = network.base_demands();
    let total: f64 = base.iter().sum();
    if total > 0.0 {
        return base.iter().map(|d| d / total).collect();
    }
    let junctions = network
        .nodes()
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Junction { .. }))
        .count();
    network
        .nodes()
        .iter()
        .map(|n| match n.kind {
            NodeKind::Junction { .. } => 1.0 / junctions as f64,
            _ => 0.0,
        })
        .collect()
}
