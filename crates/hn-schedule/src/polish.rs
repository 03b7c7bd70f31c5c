//! Post-processing of LP solutions.
//!
//! Interior-point solutions sit a hair inside or outside their bounds.
//! Polishing clamps every flow into its box and then covers any demand
//! shortfall on the cheapest pumps first; verification re-checks the flow
//! constraints on the polished plan.

/// Box and price for each pump in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBox {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Cost per m³/h delivered.
    pub marginal_cost: Vec<f64>,
}

impl PeriodBox {
    pub fn capacity(&self) -> f64 {
        self.upper.iter().sum()
    }

    /// Pump indices by ascending marginal cost, ties in request order.
    pub fn merit_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.marginal_cost.len()).collect();
        order.sort_by(|&a, &b| self.marginal_cost[a].total_cmp(&self.marginal_cost[b]).then(a.cmp(&b)));
        order
    }
}

/// Clamp into the box, then top up toward `demand_m3h` in merit order.
pub fn polish(flows: &mut [f64], period: &PeriodBox, demand_m3h: f64) {
    for (k, q) in flows.iter_mut().enumerate() {
        *q = q.clamp(period.lower[k], period.upper[k]);
    }
    for k in period.merit_order() {
        let deficit = demand_m3h - flows.iter().sum::<f64>();
        if deficit <= 0.0 {
            break;
        }
        let room = period.upper[k] - flows[k];
        flows[k] += deficit.min(room);
    }
}

/// First violated hard constraint, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Bound { pump: usize, flow: f64 },
    Demand { delivered: f64 },
}

pub fn verify(flows: &[f64], period: &PeriodBox, demand_m3h: f64, tolerance: f64) -> Result<(), Violation> {
    for (k, &q) in flows.iter().enumerate() {
        if !q.is_finite() || q < period.lower[k] - tolerance || q > period.upper[k] + tolerance {
            return Err(Violation::Bound { pump: k, flow: q });
        }
    }
    let delivered: f64 = flows.iter().sum();
    if delivered < demand_m3h - tolerance * (1.0 + demand_m3h.abs()) {
        return Err(Violation::Demand { delivered });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> PeriodBox {
        PeriodBox {
            lower: vec![0.0, 10.0, 0.0],
            upper: vec![50.0, 60.0, 100.0],
            marginal_cost: vec![2.0, 1.5, 1.5],
        }
    }

    #[test]
    fn merit_order_breaks_ties_by_position() {
        assert_eq!(period().merit_order(), vec![1, 2, 0]);
    }

    #[test]
    fn polish_clamps_then_tops_up_cheapest() {
        let p = period();
        let mut flows = vec![-1e-9, 9.999_999, 40.0];
        polish(&mut flows, &p, 120.0);
        assert_eq!(flows[0], 0.0);
        assert_eq!(flows[1], 60.0);
        assert!((flows[2] - 60.0).abs() < 1e-12);
        assert!(verify(&flows, &p, 120.0, 1e-9).is_ok());
    }

    #[test]
    fn verify_reports_shortfall() {
        let p = period();
        let flows = vec![0.0, 10.0, 0.0];
        assert!(matches!(verify(&flows, &p, 100.0, 1e-6), Err(Violation::Demand { .. })));
    }
}
