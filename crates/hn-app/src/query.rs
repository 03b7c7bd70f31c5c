//! Query helpers for loaded runs.

use chrono::{DateTime, Utc};
use hn_results::SimulationRun;

use crate::error::{AppError, AppResult};

/// Summary of a run's extent and extremes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub periods: usize,
    pub node_count: usize,
    pub link_count: usize,
    pub unconverged_periods: usize,
    /// Lowest pressure seen (node, period, m).
    pub min_pressure: (String, usize, f64),
    pub max_pressure: (String, usize, f64),
    pub anomaly_count: usize,
    pub schedule_cost: Option<f64>,
}

pub fn get_run_summary(run: &SimulationRun) -> AppResult<RunSummary> {
    let first = run
        .snapshots
        .first()
        .ok_or_else(|| AppError::InvalidInput(format!("run {} has no snapshots", run.run_id)))?;

    let mut min_pressure = (String::new(), 0, f64::INFINITY);
    let mut max_pressure = (String::new(), 0, f64::NEG_INFINITY);
    for snapshot in &run.snapshots {
        for node in &snapshot.nodes {
            if node.pressure_m < min_pressure.2 {
                min_pressure = (node.node.clone(), snapshot.period, node.pressure_m);
            }
            if node.pressure_m > max_pressure.2 {
                max_pressure = (node.node.clone(), snapshot.period, node.pressure_m);
            }
        }
    }

    Ok(RunSummary {
        periods: run.snapshots.len(),
        node_count: first.nodes.len(),
        link_count: first.links.len(),
        unconverged_periods: run.snapshots.iter().filter(|s| !s.converged).count(),
        min_pressure,
        max_pressure,
        anomaly_count: run.anomalies.len(),
        schedule_cost: run.schedule.as_ref().map(|s| s.total_cost),
    })
}

/// Pressure series of one node across the run's periods.
pub fn node_series(run: &SimulationRun, node: &str) -> Vec<(DateTime<Utc>, f64)> {
    run.snapshots
        .iter()
        .filter_map(|s| s.pressure_m(node).map(|p| (s.timestamp, p)))
        .collect()
}
