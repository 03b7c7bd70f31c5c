//! Per-period pump schedule optimization.
//!
//! Periods are independent: each one is a small LP over pump flows,
//!
//! ```text
//! minimize    Σ_k flow_k · unit_cost_k / efficiency_k
//! subject to  Σ_k flow_k >= forecast
//!             min_flow_k <= flow_k <= capacity_k · availability_k
//!             p_min_i <= p_i(flow, forecast) <= p_max_i
//! ```
//!
//! with pressures linearized by the `PressureModel`. A candidate is
//! polished and re-checked against the model. Nonlinear models are
//! re-linearized around each candidate until it stops moving; the cheapest
//! candidate the model accepts is kept.

use std::collections::HashMap;

use hn_core::CancelToken;
use hn_core::cancel::is_cancelled;
use hn_network::NetworkModel;

use crate::backend::{ClarabelBackend, LinearProgram, LpBackend, LpOutcome, LpRow};
use crate::config::OptimizerConfig;
use crate::error::{InfeasibilityClass, InfeasibleSchedule, ScheduleError, ScheduleResult};
use crate::oracle::{HydraulicOracle, resolve_pumps};
use crate::polish::{PeriodBox, Violation, polish, verify};
use crate::pressure::{NoPressureModel, PressureModel};
use crate::types::{PressureBound, PumpScheduleEntry, PumpSpec, Schedule, ScheduleRequest};

/// Optimize a schedule over `horizon` periods against the network.
///
/// Monitored pressures are checked with the hydraulic oracle; with no
/// bounds the network is only used to resolve pump names.
pub fn optimize(
    network: &NetworkModel,
    forecast_m3h: &[f64],
    pumps: &[PumpSpec],
    bounds: &[PressureBound],
    horizon: usize,
    config: &OptimizerConfig,
) -> ScheduleResult<Schedule> {
    if forecast_m3h.len() != horizon {
        return Err(ScheduleError::invalid(format!(
            "forecast has {} periods for a horizon of {horizon}",
            forecast_m3h.len()
        )));
    }
    let request = ScheduleRequest::new(forecast_m3h.to_vec(), pumps.to_vec()).with_bounds(bounds.to_vec());
    let mut optimizer = ScheduleOptimizer::new(config.clone());
    optimizer.optimize_network(network, &request, None)
}

/// Optimizer with a per-period solution cache.
///
/// `optimize` starts from an empty cache; `reoptimize` reuses every period
/// whose inputs (forecast, pump data, pressure model, tolerances) are
/// unchanged since the last run.
pub struct ScheduleOptimizer {
    config: OptimizerConfig,
    backend: Box<dyn LpBackend>,
    cache: HashMap<String, Vec<f64>>,
    last_hits: usize,
}

impl ScheduleOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_backend(config, Box::new(ClarabelBackend))
    }

    pub fn with_backend(config: OptimizerConfig, backend: Box<dyn LpBackend>) -> Self {
        Self {
            config,
            backend,
            cache: HashMap::new(),
            last_hits: 0,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Periods served from the cache by the last run.
    pub fn cache_hits(&self) -> usize {
        self.last_hits
    }

    pub fn cached_periods(&self) -> usize {
        self.cache.len()
    }

    pub fn optimize(
        &mut self,
        request: &ScheduleRequest,
        model: &dyn PressureModel,
        cancel: Option<&CancelToken>,
    ) -> ScheduleResult<Schedule> {
        self.cache.clear();
        self.run(request, model, cancel)
    }

    pub fn reoptimize(
        &mut self,
        request: &ScheduleRequest,
        model: &dyn PressureModel,
        cancel: Option<&CancelToken>,
    ) -> ScheduleResult<Schedule> {
        self.run(request, model, cancel)
    }

    /// `reoptimize` with the pressure model chosen from the request: the
    /// hydraulic oracle when bounds are given, otherwise none.
    pub fn optimize_network(
        &mut self,
        network: &NetworkModel,
        request: &ScheduleRequest,
        cancel: Option<&CancelToken>,
    ) -> ScheduleResult<Schedule> {
        request.validate()?;
        if request.bounds.is_empty() {
            resolve_pumps(network, &request.pumps)?;
            self.reoptimize(request, &NoPressureModel, cancel)
        } else {
            let oracle = HydraulicOracle::new(network, &request.pumps, request.bounds.clone(), &self.config)?;
            self.reoptimize(request, &oracle, cancel)
        }
    }

    fn run(
        &mut self,
        request: &ScheduleRequest,
        model: &dyn PressureModel,
        cancel: Option<&CancelToken>,
    ) -> ScheduleResult<Schedule> {
        request.validate()?;
        let fingerprint = format!("{}#{}#{}", model.fingerprint(), self.config.fingerprint(), self.backend.name());
        self.last_hits = 0;

        let mut plan = Vec::with_capacity(request.horizon());
        for period in 0..request.horizon() {
            if is_cancelled(cancel) {
                return Err(ScheduleError::Cancelled { period });
            }
            let key = period_key(request, period, &fingerprint);
            let flows = match self.cache.get(&key) {
                Some(flows) => {
                    self.last_hits += 1;
                    flows.clone()
                }
                None => {
                    let flows = self.solve_period(request, model, period)?;
                    self.cache.insert(key, flows.clone());
                    flows
                }
            };
            tracing::debug!(period, delivered = flows.iter().sum::<f64>(), "period scheduled");
            plan.push(flows);
        }

        let schedule = assemble(request, &plan);
        tracing::info!(
            horizon = schedule.horizon,
            total_cost = schedule.total_cost,
            cache_hits = self.last_hits,
            "pump schedule optimized"
        );
        Ok(schedule)
    }

    fn solve_period(
        &self,
        request: &ScheduleRequest,
        model: &dyn PressureModel,
        period: usize,
    ) -> ScheduleResult<Vec<f64>> {
        let demand = request.forecast_m3h[period];
        let bounds = period_box(request, period);
        precheck(request, &bounds, period, demand, self.config.feasibility_tolerance)?;

        let n = request.pumps.len();
        let demand_row = LpRow::at_least("demand", vec![1.0; n], demand);
        // Linearize first at full delivery; local slopes near zero surplus
        // understate what the pumps can do.
        let mut reference = bounds.upper.clone();
        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut violated = Vec::new();

        for attempt in 0..=self.config.max_refinements {
            let surrogate = model.linearize(period, &reference, demand)?;
            let pressure_rows = surrogate.rows(demand);

            let mut rows = Vec::with_capacity(pressure_rows.len() + 1);
            rows.push(demand_row.clone());
            rows.extend(pressure_rows.iter().cloned());
            let lp = LinearProgram {
                lower: bounds.lower.clone(),
                upper: bounds.upper.clone(),
                cost: bounds.marginal_cost.clone(),
                rows,
            };

            let mut flows = match self.backend.solve(&lp)? {
                LpOutcome::Optimal(x) => x,
                LpOutcome::Infeasible if best.is_some() => break,
                LpOutcome::Infeasible => {
                    return Err(self.diagnose_pressure(period, &bounds, &demand_row, &pressure_rows)?.into());
                }
            };
            polish(&mut flows, &bounds, demand);
            if let Err(v) = verify(&flows, &bounds, demand, self.config.feasibility_tolerance) {
                return Err(flow_violation(request, period, v).into());
            }

            let pressures = model.predict(period, &flows, demand)?;
            violated = model
                .bounds()
                .iter()
                .zip(&pressures)
                .filter(|(b, p)| !b.contains(**p, self.config.pressure_tolerance_m))
                .map(|(b, p)| format!("{} ({p:.3} m outside [{}, {}])", b.node, b.min_m, b.max_m))
                .collect::<Vec<_>>();

            let moved = flows
                .iter()
                .zip(&reference)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            if violated.is_empty() {
                let cost = lp.objective(&flows);
                if best.as_ref().is_none_or(|(c, _)| cost < *c) {
                    best = Some((cost, flows.clone()));
                }
                if model.is_linear() || moved <= self.config.refinement_tolerance_m3h {
                    break;
                }
            } else {
                tracing::debug!(period, attempt, violated = violated.len(), "pressure check failed, re-linearizing");
            }
            reference = flows;
        }

        if let Some((_, flows)) = best {
            return Ok(flows);
        }
        tracing::warn!(period, "pressure bounds not met after re-linearization");
        Err(InfeasibleSchedule {
            period,
            class: InfeasibilityClass::Pressure,
            detail: format!("pressure bounds violated at {}", violated.join(", ")),
        }
        .into())
    }

    /// Name the monitored nodes whose bound alone is unreachable; if every
    /// bound is reachable on its own, the conflict is between them.
    fn diagnose_pressure(
        &self,
        period: usize,
        bounds: &PeriodBox,
        demand_row: &LpRow,
        pressure_rows: &[LpRow],
    ) -> ScheduleResult<InfeasibleSchedule> {
        let mut unreachable = Vec::new();
        for row in pressure_rows {
            let lp = LinearProgram {
                lower: bounds.lower.clone(),
                upper: bounds.upper.clone(),
                cost: vec![0.0; bounds.lower.len()],
                rows: vec![demand_row.clone(), row.clone()],
            };
            if self.backend.solve(&lp)? == LpOutcome::Infeasible {
                unreachable.push(row.label.clone());
            }
        }
        let detail = if unreachable.is_empty() {
            let all: Vec<&str> = pressure_rows.iter().map(|r| r.label.as_str()).collect();
            format!("pressure bounds at {} cannot hold together", all.join(", "))
        } else {
            format!("pressure bounds unreachable at {}", unreachable.join(", "))
        };
        Ok(InfeasibleSchedule {
            period,
            class: InfeasibilityClass::Pressure,
            detail,
        })
    }
}

fn period_box(request: &ScheduleRequest, period: usize) -> PeriodBox {
    PeriodBox {
        lower: request.pumps.iter().map(|p| p.min_flow_m3h).collect(),
        upper: request.pumps.iter().map(|p| p.available_capacity(period)).collect(),
        marginal_cost: request.pumps.iter().map(|p| p.marginal_cost(period)).collect(),
    }
}

fn precheck(
    request: &ScheduleRequest,
    bounds: &PeriodBox,
    period: usize,
    demand: f64,
    tolerance: f64,
) -> Result<(), InfeasibleSchedule> {
    for (k, pump) in request.pumps.iter().enumerate() {
        if bounds.lower[k] > bounds.upper[k] + tolerance {
            return Err(InfeasibleSchedule {
                period,
                class: InfeasibilityClass::Capacity,
                detail: format!(
                    "pump '{}' minimum flow {} m3/h exceeds available capacity {} m3/h",
                    pump.id, bounds.lower[k], bounds.upper[k]
                ),
            });
        }
    }
    let capacity = bounds.capacity();
    if demand > capacity + tolerance {
        return Err(InfeasibleSchedule {
            period,
            class: InfeasibilityClass::Demand,
            detail: format!("forecast {demand} m3/h exceeds available capacity {capacity} m3/h"),
        });
    }
    Ok(())
}

fn flow_violation(request: &ScheduleRequest, period: usize, violation: Violation) -> InfeasibleSchedule {
    match violation {
        Violation::Bound { pump, flow } => InfeasibleSchedule {
            period,
            class: InfeasibilityClass::Capacity,
            detail: format!("pump '{}' flow {flow} m3/h outside its bounds", request.pumps[pump].id),
        },
        Violation::Demand { delivered } => InfeasibleSchedule {
            period,
            class: InfeasibilityClass::Demand,
            detail: format!(
                "delivered {delivered} m3/h short of forecast {} m3/h",
                request.forecast_m3h[period]
            ),
        },
    }
}

fn period_key(request: &ScheduleRequest, period: usize, fingerprint: &str) -> String {
    let mut key = format!("{fingerprint}@{period}:{:x}", request.forecast_m3h[period].to_bits());
    for pump in &request.pumps {
        key.push_str(&format!(
            "|{}:{:x}:{:x}:{:x}:{:x}:{:x}",
            pump.id,
            pump.capacity_m3h.to_bits(),
            pump.efficiency.to_bits(),
            pump.unit_cost[period].to_bits(),
            pump.min_flow_m3h.to_bits(),
            pump.availability_at(period).to_bits()
        ));
    }
    key
}

fn assemble(request: &ScheduleRequest, plan: &[Vec<f64>]) -> Schedule {
    let mut entries = Vec::with_capacity(plan.len() * request.pumps.len());
    let mut period_costs = Vec::with_capacity(plan.len());
    for (period, flows) in plan.iter().enumerate() {
        let mut period_cost = 0.0;
        for (pump, &flow_m3h) in request.pumps.iter().zip(flows) {
            let cost = flow_m3h * pump.marginal_cost(period);
            period_cost += cost;
            entries.push(PumpScheduleEntry {
                pump: pump.id.clone(),
                period,
                flow_m3h,
                cost,
            });
        }
        period_costs.push(period_cost);
    }
    Schedule {
        horizon: plan.len(),
        total_cost: period_costs.iter().sum(),
        entries,
        period_costs,
    }
}
