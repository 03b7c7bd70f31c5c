//! Pressure models for the scheduling LP.
//!
//! A model predicts monitored pressures from pump flows and total demand,
//! and supplies a linearization of itself for the LP rows:
//!
//! `p_i ≈ base_i + Σ_k b_ik · flow_k + g_i · demand`

use serde::{Deserialize, Serialize};

use crate::backend::LpRow;
use crate::error::{ScheduleError, ScheduleResult};
use crate::types::PressureBound;

pub trait PressureModel {
    /// Monitored nodes in row order.
    fn bounds(&self) -> &[PressureBound];

    /// Pressures (m) at the monitored nodes for pump flows (m³/h, request
    /// order) and total demand (m³/h) in a period.
    fn predict(&self, period: usize, flows_m3h: &[f64], demand_m3h: f64) -> ScheduleResult<Vec<f64>>;

    /// Linear model valid around the given operating point.
    fn linearize(&self, period: usize, flows_m3h: &[f64], demand_m3h: f64) -> ScheduleResult<LinearSurrogate>;

    /// Stable text identifying the model's inputs, used in cache keys.
    fn fingerprint(&self) -> String;

    /// True when `linearize` is exact everywhere.
    fn is_linear(&self) -> bool {
        false
    }
}

/// Unconstrained pressures; used when no node is monitored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPressureModel;

impl PressureModel for NoPressureModel {
    fn bounds(&self) -> &[PressureBound] {
        &[]
    }

    fn predict(&self, _period: usize, _flows_m3h: &[f64], _demand_m3h: f64) -> ScheduleResult<Vec<f64>> {
        Ok(Vec::new())
    }

    fn linearize(&self, _period: usize, flows_m3h: &[f64], _demand_m3h: f64) -> ScheduleResult<LinearSurrogate> {
        Ok(LinearSurrogate {
            bounds: Vec::new(),
            base: Vec::new(),
            pump_sensitivity: Vec::new(),
            demand_sensitivity: Vec::new(),
            pumps: flows_m3h.len(),
        })
    }

    fn fingerprint(&self) -> String {
        "none".to_string()
    }

    fn is_linear(&self) -> bool {
        true
    }
}

/// Affine pressure model, one row per monitored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSurrogate {
    bounds: Vec<PressureBound>,
    base: Vec<f64>,
    /// `pump_sensitivity[i][k]`: dp_i/dflow_k (m per m³/h)
    pump_sensitivity: Vec<Vec<f64>>,
    /// dp_i/ddemand (m per m³/h)
    demand_sensitivity: Vec<f64>,
    pumps: usize,
}

impl LinearSurrogate {
    pub fn new(
        bounds: Vec<PressureBound>,
        base: Vec<f64>,
        pump_sensitivity: Vec<Vec<f64>>,
        demand_sensitivity: Vec<f64>,
    ) -> ScheduleResult<Self> {
        let n = bounds.len();
        if base.len() != n || pump_sensitivity.len() != n || demand_sensitivity.len() != n {
            return Err(ScheduleError::invalid(format!(
                "surrogate has {n} bounds but {} bases, {} sensitivity rows, {} demand terms",
                base.len(),
                pump_sensitivity.len(),
                demand_sensitivity.len()
            )));
        }
        let pumps = pump_sensitivity.first().map_or(0, Vec::len);
        if pump_sensitivity.iter().any(|row| row.len() != pumps) {
            return Err(ScheduleError::invalid("surrogate sensitivity rows differ in length"));
        }
        let finite = base
            .iter()
            .chain(&demand_sensitivity)
            .chain(pump_sensitivity.iter().flatten())
            .all(|v| v.is_finite());
        if !finite {
            return Err(ScheduleError::invalid("surrogate coefficients must be finite"));
        }
        Ok(Self { bounds, base, pump_sensitivity, demand_sensitivity, pumps })
    }

    pub fn pumps(&self) -> usize {
        self.pumps
    }

    pub fn base(&self) -> &[f64] {
        &self.base
    }

    pub fn pump_sensitivity(&self) -> &[Vec<f64>] {
        &self.pump_sensitivity
    }

    pub fn demand_sensitivity(&self) -> &[f64] {
        &self.demand_sensitivity
    }

    /// LP rows over pump flows with the demand term moved to the bounds.
    pub fn rows(&self, demand_m3h: f64) -> Vec<LpRow> {
        self.bounds
            .iter()
            .enumerate()
            .map(|(i, bound)| {
                let offset = self.base[i] + self.demand_sensitivity[i] * demand_m3h;
                LpRow {
                    label: bound.node.clone(),
                    coeffs: self.pump_sensitivity[i].clone(),
                    lower: bound.min_m - offset,
                    upper: bound.max_m - offset,
                }
            })
            .collect()
    }

    fn evaluate(&self, flows_m3h: &[f64], demand_m3h: f64) -> Vec<f64> {
        (0..self.bounds.len())
            .map(|i| {
                let pumped: f64 = self.pump_sensitivity[i].iter().zip(flows_m3h).map(|(b, q)| b * q).sum();
                self.base[i] + pumped + self.demand_sensitivity[i] * demand_m3h
            })
            .collect()
    }
}

impl PressureModel for LinearSurrogate {
    fn bounds(&self) -> &[PressureBound] {
        &self.bounds
    }

    fn predict(&self, _period: usize, flows_m3h: &[f64], demand_m3h: f64) -> ScheduleResult<Vec<f64>> {
        if flows_m3h.len() != self.pumps {
            return Err(ScheduleError::invalid(format!(
                "surrogate built for {} pumps, got {} flows",
                self.pumps,
                flows_m3h.len()
            )));
        }
        Ok(self.evaluate(flows_m3h, demand_m3h))
    }

    fn linearize(&self, _period: usize, _flows_m3h: &[f64], _demand_m3h: f64) -> ScheduleResult<LinearSurrogate> {
        Ok(self.clone())
    }

    fn fingerprint(&self) -> String {
        let mut out = String::from("linear");
        for (i, bound) in self.bounds.iter().enumerate() {
            out.push_str(&format!(
                "|{}:{:x}:{:x}:{:x}:{:x}",
                bound.node,
                bound.min_m.to_bits(),
                bound.max_m.to_bits(),
                self.base[i].to_bits(),
                self.demand_sensitivity[i].to_bits()
            ));
            for b in &self.pump_sensitivity[i] {
                out.push_str(&format!(":{:x}", b.to_bits()));
            }
        }
        out
    }

    fn is_linear(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surrogate() -> LinearSurrogate {
        LinearSurrogate::new(
            vec![PressureBound::new("J1", 20.0, 60.0)],
            vec![30.0],
            vec![vec![0.1, 0.05]],
            vec![-0.02],
        )
        .unwrap()
    }

    #[test]
    fn rows_shift_bounds_by_base_and_demand() {
        let rows = surrogate().rows(100.0);
        assert_eq!(rows.len(), 1);
        // offset = 30 - 2 = 28
        assert!((rows[0].lower - (-8.0)).abs() < 1e-12);
        assert!((rows[0].upper - 32.0).abs() < 1e-12);
        assert_eq!(rows[0].label, "J1");
    }

    #[test]
    fn predict_matches_rows() {
        let s = surrogate();
        let p = s.predict(0, &[100.0, 40.0], 100.0).unwrap();
        assert!((p[0] - (30.0 + 10.0 + 2.0 - 2.0)).abs() < 1e-12);
        let row = &s.rows(100.0)[0];
        assert!((row.activity(&[100.0, 40.0]) - (p[0] - 28.0)).abs() < 1e-12);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let err = LinearSurrogate::new(vec![PressureBound::new("J1", 0.0, 1.0)], vec![], vec![], vec![]);
        assert!(err.is_err());
    }
}
