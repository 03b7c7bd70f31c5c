//! Statistical scoring capability.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::sample::{PressureSample, Severity};

/// Per-node pressure series, each strictly increasing in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PressureWindow {
    series: BTreeMap<String, Vec<(DateTime<Utc>, f64)>>,
}

impl PressureWindow {
    /// Group samples by node, preserving their order.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a PressureSample>) -> Self {
        let mut series: BTreeMap<String, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
        for s in samples {
            series
                .entry(s.node.clone())
                .or_default()
                .push((s.timestamp, s.pressure_m));
        }
        Self { series }
    }

    /// Node names in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series(&self) -> impl Iterator<Item = (&str, &[(DateTime<Utc>, f64)])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn node_series(&self, node: &str) -> Option<&[(DateTime<Utc>, f64)]> {
        self.series.get(node).map(Vec::as_slice)
    }

    /// Timestamps observed at every node, ascending, with the pressure
    /// vector (node order as `nodes()`) at each.
    pub fn aligned(&self) -> Vec<(DateTime<Utc>, Vec<f64>)> {
        let Some((_, first)) = self.series.iter().next() else {
            return Vec::new();
        };
        let lookups: Vec<BTreeMap<DateTime<Utc>, f64>> = self
            .series
            .values()
            .map(|v| v.iter().copied().collect())
            .collect();
        first
            .iter()
            .filter_map(|(t, _)| {
                let row: Option<Vec<f64>> = lookups.iter().map(|m| m.get(t).copied()).collect();
                row.map(|r| (*t, r))
            })
            .collect()
    }
}

/// One sample singled out by a scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub observed_m: f64,
    pub severity: Severity,
    pub score: f64,
}

/// Scores a window of per-node pressure series and returns the outlier
/// subset. Implementations must be deterministic.
pub trait OutlierScorer: Send + Sync {
    /// Backend name recorded on events.
    fn name(&self) -> &'static str;

    fn score(&self, window: &PressureWindow) -> Vec<Outlier>;
}

/// Mean and (population) standard deviation.
pub(crate) fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}
