//! Extended-period simulation.
//!
//! One steady solve per period. Between periods junction demands and
//! reservoir heads follow their patterns and every tank level moves by its
//! net inflow over the period, clamped to the tank's operating range.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use hn_core::CancelToken;
use hn_core::cancel::is_cancelled;
use hn_network::{NetworkModel, NodeKind};
use hn_project::SimulationDef;
use hn_results::{LinkSnapshot, NodeSnapshot, Snapshot};
use hn_solver::{Controls, NewtonConfig, SolveResult, SolverError, solve_with};

use crate::error::{AppError, AppResult};
use crate::progress::PeriodProgress;

/// Period count, length and start time of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodClock {
    pub start: DateTime<Utc>,
    pub period_hours: f64,
    pub periods: usize,
}

impl PeriodClock {
    /// A single steady solve stamped at the Unix epoch.
    pub fn steady() -> Self {
        Self {
            start: DateTime::<Utc>::UNIX_EPOCH,
            period_hours: 1.0,
            periods: 1,
        }
    }

    pub fn from_def(def: Option<&SimulationDef>) -> AppResult<Self> {
        let Some(def) = def else {
            return Ok(Self::steady());
        };
        if def.periods == 0 || !(def.period_hours.is_finite() && def.period_hours > 0.0) {
            return Err(AppError::InvalidInput(format!(
                "simulation needs at least one period of positive length (got {} x {} h)",
                def.periods, def.period_hours
            )));
        }
        let start = match &def.start {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map_err(|e| AppError::InvalidInput(format!("simulation start '{text}': {e}")))?
                .with_timezone(&Utc),
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        Ok(Self {
            start,
            period_hours: def.period_hours,
            periods: def.periods,
        })
    }

    pub fn timestamp(&self, period: usize) -> DateTime<Utc> {
        let ms = (period as f64 * self.period_hours * 3_600_000.0).round() as i64;
        self.start + Duration::milliseconds(ms)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationOutput {
    pub snapshots: Vec<Snapshot>,
    /// Tank levels (m) after the last completed period.
    pub final_levels: BTreeMap<String, f64>,
    /// Set when a cancel request stopped the run early; `snapshots` holds
    /// the periods finished before it.
    pub cancelled: bool,
}

impl SimulationOutput {
    pub fn unconverged_periods(&self) -> Vec<usize> {
        self.snapshots
            .iter()
            .filter(|s| !s.converged)
            .map(|s| s.period)
            .collect()
    }
}

/// Run `clock.periods` solves, warm-starting each from the previous one.
///
/// Non-convergence is recorded on the snapshot; setup failures (isolated
/// nodes, singular systems) abort the simulation.
pub fn simulate(
    network: &NetworkModel,
    controls: &Controls,
    config: &NewtonConfig,
    clock: &PeriodClock,
    cancel: Option<&CancelToken>,
    on_period: &mut dyn FnMut(PeriodProgress),
) -> AppResult<SimulationOutput> {
    let mut levels: BTreeMap<usize, f64> = network
        .nodes()
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Tank(t) => Some((n.id.idx(), t.initial_level_m)),
            _ => None,
        })
        .collect();

    let mut output = SimulationOutput::default();
    let mut previous: Option<SolveResult> = None;

    for period in 0..clock.periods {
        if is_cancelled(cancel) {
            output.cancelled = true;
            break;
        }
        let demands = network.demands_at(period);
        let period_controls = with_source_heads(network, controls, &levels, period);

        let result = match solve_with(
            network,
            &demands,
            &period_controls,
            config,
            previous.as_ref(),
            cancel,
        ) {
            Ok(result) => result,
            Err(SolverError::Cancelled { .. }) => {
                output.cancelled = true;
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if !result.converged {
            tracing::warn!(
                period,
                iterations = result.iterations,
                max_residual = result.max_residual,
                "period did not converge"
            );
        }
        on_period(PeriodProgress {
            period,
            periods: clock.periods,
            iterations: result.iterations,
            max_residual_m3h: result.max_residual,
            converged: result.converged,
        });

        output
            .snapshots
            .push(snapshot_of(network, period, clock.timestamp(period), &demands, &result));
        update_levels(network, &result, clock.period_hours, &mut levels);
        previous = Some(result);
    }

    output.final_levels = levels
        .into_iter()
        .map(|(idx, level)| (network.nodes()[idx].name.clone(), level))
        .collect();
    Ok(output)
}

fn with_source_heads(
    network: &NetworkModel,
    controls: &Controls,
    levels: &BTreeMap<usize, f64>,
    period: usize,
) -> Controls {
    let mut out = controls.clone();
    for node in network.sources() {
        let head = match &node.kind {
            NodeKind::Tank(_) => levels.get(&node.id.idx()).map(|l| node.elevation_m + l),
            _ => network.reservoir_head_at(node, period),
        };
        if let Some(head) = head {
            out = out.with_source_head(node.id, head);
        }
    }
    out
}

fn update_levels(
    network: &NetworkModel,
    result: &SolveResult,
    period_hours: f64,
    levels: &mut BTreeMap<usize, f64>,
) {
    for node in network.nodes() {
        let NodeKind::Tank(tank) = &node.kind else {
            continue;
        };
        let inflow_m3h: f64 = network
            .incident_links(node.id)
            .iter()
            .map(|&lid| {
                let link = &network.links()[lid.idx()];
                let q = result.flow(lid);
                if link.to == node.id { q } else { -q }
            })
            .sum();
        if let Some(level) = levels.get_mut(&node.id.idx()) {
            *level = tank.clamp_level(*level + inflow_m3h * period_hours / tank.area_m2());
        }
    }
}

/// Flatten a solve into a named snapshot.
pub fn snapshot_of(
    network: &NetworkModel,
    period: usize,
    timestamp: DateTime<Utc>,
    demands_m3h: &[f64],
    result: &SolveResult,
) -> Snapshot {
    let nodes = network
        .nodes()
        .iter()
        .map(|n| NodeSnapshot {
            node: n.name.clone(),
            head_m: result.head(n.id),
            pressure_m: result.pressure(n.id),
            demand_m3h: demands_m3h[n.id.idx()],
        })
        .collect();
    let links = network
        .links()
        .iter()
        .map(|l| LinkSnapshot {
            link: l.name.clone(),
            flow_m3h: result.flow(l.id),
            headloss_m: result.headlosses[l.id.idx()],
            status: result.link_status[l.id.idx()],
        })
        .collect();
    Snapshot {
        period,
        timestamp,
        converged: result.converged,
        iterations: result.iterations,
        max_residual_m3h: result.max_residual,
        nodes,
        links,
    }
}
