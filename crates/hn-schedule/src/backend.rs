//! LP backends.
//!
//! A period is handed to the backend as a plain `LinearProgram`: boxed
//! variables, a linear cost and two-sided rows. Infinite row sides are
//! dropped.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, constraint, variable, variables,
};

use crate::error::{ScheduleError, ScheduleResult};

/// `lower <= Σ coeffs[i]·x[i] <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct LpRow {
    pub label: String,
    pub coeffs: Vec<f64>,
    pub lower: f64,
    pub upper: f64,
}

impl LpRow {
    pub fn at_least(label: impl Into<String>, coeffs: Vec<f64>, lower: f64) -> Self {
        Self { label: label.into(), coeffs, lower, upper: f64::INFINITY }
    }

    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coeffs.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    pub fn is_satisfied(&self, x: &[f64], tolerance: f64) -> bool {
        let a = self.activity(x);
        a >= self.lower - tolerance && a <= self.upper + tolerance
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub cost: Vec<f64>,
    pub rows: Vec<LpRow>,
}

impl LinearProgram {
    pub fn len(&self) -> usize {
        self.cost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cost.is_empty()
    }

    pub fn objective(&self, x: &[f64]) -> f64 {
        self.cost.iter().zip(x).map(|(c, v)| c * v).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    Optimal(Vec<f64>),
    Infeasible,
}

/// Solves a constrained linear objective.
pub trait LpBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, lp: &LinearProgram) -> ScheduleResult<LpOutcome>;
}

/// Interior-point backend: clarabel through good_lp.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl LpBackend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, lp: &LinearProgram) -> ScheduleResult<LpOutcome> {
        let mut vars = variables!();
        let x: Vec<Variable> = lp
            .lower
            .iter()
            .zip(&lp.upper)
            .map(|(&lo, &hi)| vars.add(variable().min(lo).max(hi)))
            .collect();

        let objective = linear(&lp.cost, &x);
        let mut problem = vars.minimise(objective).using(clarabel);

        for row in &lp.rows {
            if row.lower.is_finite() {
                problem = problem.with(constraint!(linear(&row.coeffs, &x) >= row.lower));
            }
            if row.upper.is_finite() {
                problem = problem.with(constraint!(linear(&row.coeffs, &x) <= row.upper));
            }
        }

        match problem.solve() {
            Ok(solution) => Ok(LpOutcome::Optimal(x.iter().map(|v| solution.value(*v)).collect())),
            Err(ResolutionError::Infeasible) => Ok(LpOutcome::Infeasible),
            Err(e) => Err(ScheduleError::Backend {
                backend: self.name(),
                what: e.to_string(),
            }),
        }
    }
}

fn linear(coeffs: &[f64], x: &[Variable]) -> Expression {
    let mut expr = Expression::from(0.0);
    for (c, v) in coeffs.iter().zip(x) {
        if *c != 0.0 {
            expr += *c * *v;
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pumps() -> LinearProgram {
        LinearProgram {
            lower: vec![0.0, 0.0],
            upper: vec![100.0, 100.0],
            cost: vec![1.0, 2.0],
            rows: vec![LpRow::at_least("demand", vec![1.0, 1.0], 150.0)],
        }
    }

    #[test]
    fn clarabel_fills_cheapest_first() {
        let LpOutcome::Optimal(x) = ClarabelBackend.solve(&two_pumps()).unwrap() else {
            panic!("expected an optimum");
        };
        assert!((x[0] - 100.0).abs() < 1e-4);
        assert!((x[1] - 50.0).abs() < 1e-4);
    }

    #[test]
    fn clarabel_reports_infeasible() {
        let mut lp = two_pumps();
        lp.rows[0].lower = 250.0;
        assert_eq!(ClarabelBackend.solve(&lp).unwrap(), LpOutcome::Infeasible);
    }
}
