//! Schedule inputs and outputs.

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// One schedulable pump. `unit_cost` and `availability` are per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpSpec {
    /// Name of the pump link in the network.
    pub id: String,
    pub capacity_m3h: f64,
    /// Wire-to-water efficiency in (0, 1].
    pub efficiency: f64,
    pub unit_cost: Vec<f64>,
    #[serde(default)]
    pub min_flow_m3h: f64,
    /// Fraction of capacity available per period; empty means fully available.
    #[serde(default)]
    pub availability: Vec<f64>,
}

impl PumpSpec {
    pub fn new(id: impl Into<String>, capacity_m3h: f64, efficiency: f64, unit_cost: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            capacity_m3h,
            efficiency,
            unit_cost,
            min_flow_m3h: 0.0,
            availability: Vec::new(),
        }
    }

    pub fn with_min_flow(mut self, min_flow_m3h: f64) -> Self {
        self.min_flow_m3h = min_flow_m3h;
        self
    }

    pub fn with_availability(mut self, availability: Vec<f64>) -> Self {
        self.availability = availability;
        self
    }

    pub fn availability_at(&self, period: usize) -> f64 {
        self.availability.get(period).copied().unwrap_or(1.0)
    }

    /// Upper flow bound in a period.
    pub fn available_capacity(&self, period: usize) -> f64 {
        self.capacity_m3h * self.availability_at(period)
    }

    /// Cost per m³/h of delivered flow in a period.
    pub fn marginal_cost(&self, period: usize) -> f64 {
        self.unit_cost[period] / self.efficiency
    }

    fn validate(&self, horizon: usize) -> ScheduleResult<()> {
        let bad = |what: String| Err(ScheduleError::invalid(format!("pump '{}': {what}", self.id)));
        if !(self.capacity_m3h.is_finite() && self.capacity_m3h >= 0.0) {
            return bad(format!("capacity must be finite and >= 0 (got {})", self.capacity_m3h));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return bad(format!("efficiency must be in (0, 1] (got {})", self.efficiency));
        }
        if !(self.min_flow_m3h.is_finite() && self.min_flow_m3h >= 0.0) {
            return bad(format!("min flow must be finite and >= 0 (got {})", self.min_flow_m3h));
        }
        if self.unit_cost.len() < horizon {
            return bad(format!("{} unit costs for a horizon of {horizon}", self.unit_cost.len()));
        }
        if let Some(c) = self.unit_cost.iter().find(|c| !c.is_finite()) {
            return bad(format!("unit cost must be finite (got {c})"));
        }
        if !self.availability.is_empty() && self.availability.len() < horizon {
            return bad(format!("{} availability values for a horizon of {horizon}", self.availability.len()));
        }
        if let Some(a) = self.availability.iter().find(|a| !(0.0..=1.0).contains(*a)) {
            return bad(format!("availability must be in [0, 1] (got {a})"));
        }
        Ok(())
    }
}

/// Admissible pressure range at a monitored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureBound {
    pub node: String,
    pub min_m: f64,
    pub max_m: f64,
}

impl PressureBound {
    pub fn new(node: impl Into<String>, min_m: f64, max_m: f64) -> Self {
        Self { node: node.into(), min_m, max_m }
    }

    pub fn contains(&self, pressure_m: f64, tolerance: f64) -> bool {
        pressure_m >= self.min_m - tolerance && pressure_m <= self.max_m + tolerance
    }
}

/// Everything one optimization run depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub forecast_m3h: Vec<f64>,
    pub pumps: Vec<PumpSpec>,
    #[serde(default)]
    pub bounds: Vec<PressureBound>,
}

impl ScheduleRequest {
    pub fn new(forecast_m3h: Vec<f64>, pumps: Vec<PumpSpec>) -> Self {
        Self { forecast_m3h, pumps, bounds: Vec::new() }
    }

    pub fn with_bounds(mut self, bounds: Vec<PressureBound>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn horizon(&self) -> usize {
        self.forecast_m3h.len()
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.pumps.is_empty() {
            return Err(ScheduleError::invalid("no pumps to schedule"));
        }
        if let Some((t, f)) = self
            .forecast_m3h
            .iter()
            .enumerate()
            .find(|(_, f)| !(f.is_finite() && **f >= 0.0))
        {
            return Err(ScheduleError::invalid(format!(
                "forecast for period {t} must be finite and >= 0 (got {f})"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for pump in &self.pumps {
            if !seen.insert(pump.id.as_str()) {
                return Err(ScheduleError::invalid(format!("pump '{}' listed twice", pump.id)));
            }
            pump.validate(self.horizon())?;
        }
        for bound in &self.bounds {
            if !(bound.min_m.is_finite() && bound.max_m.is_finite() && bound.min_m <= bound.max_m) {
                return Err(ScheduleError::invalid(format!(
                    "pressure bound for '{}' is not a finite range [{}, {}]",
                    bound.node, bound.min_m, bound.max_m
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpScheduleEntry {
    pub pump: String,
    pub period: usize,
    pub flow_m3h: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub horizon: usize,
    /// Period-major, pumps in request order.
    pub entries: Vec<PumpScheduleEntry>,
    pub period_costs: Vec<f64>,
    pub total_cost: f64,
}

impl Schedule {
    pub fn period(&self, period: usize) -> impl Iterator<Item = &PumpScheduleEntry> {
        self.entries.iter().filter(move |e| e.period == period)
    }

    pub fn delivered_m3h(&self, period: usize) -> f64 {
        self.period(period).map(|e| e.flow_m3h).sum()
    }

    pub fn flow(&self, pump: &str, period: usize) -> Option<f64> {
        self.period(period).find(|e| e.pump == pump).map(|e| e.flow_m3h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_short_cost_vectors() {
        let req = ScheduleRequest::new(vec![10.0, 10.0], vec![PumpSpec::new("P1", 50.0, 0.8, vec![1.0])]);
        assert!(matches!(req.validate(), Err(ScheduleError::InvalidInput { .. })));
    }

    #[test]
    fn empty_availability_means_full_capacity() {
        let pump = PumpSpec::new("P1", 50.0, 0.8, vec![1.0, 2.0]);
        assert_eq!(pump.available_capacity(1), 50.0);
        assert_eq!(pump.marginal_cost(1), 2.5);
    }
}
