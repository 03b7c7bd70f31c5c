//! Two-sided CUSUM drift scorer.

use crate::config::CusumConfig;
use crate::sample::Severity;
use crate::scorer::{Outlier, OutlierScorer, PressureWindow, mean_std};

/// Accumulates standardized deviations from the in-control level estimated
/// on each node's leading `baseline` samples. A sample is flagged while
/// either one-sided statistic exceeds the decision interval.
#[derive(Debug, Clone)]
pub struct CusumDrift {
    pub config: CusumConfig,
}

impl CusumDrift {
    pub fn new(config: CusumConfig) -> Self {
        Self { config }
    }
}

impl OutlierScorer for CusumDrift {
    fn name(&self) -> &'static str {
        "cusum_drift"
    }

    fn score(&self, window: &PressureWindow) -> Vec<Outlier> {
        let cfg = &self.config;
        let mut out = Vec::new();

        for (node, series) in window.series() {
            if series.len() <= cfg.baseline {
                continue;
            }
            let (mean, std) = mean_std(series[..cfg.baseline].iter().map(|(_, p)| *p));
            let std = std.max(cfg.min_std_m);

            let mut upper = 0.0_f64;
            let mut lower = 0.0_f64;
            for &(timestamp, observed) in &series[cfg.baseline..] {
                let z = (observed - mean) / std;
                upper = (upper + z - cfg.slack).max(0.0);
                lower = (lower - z - cfg.slack).max(0.0);
                let stat = upper.max(lower);
                if stat > cfg.decision {
                    out.push(Outlier {
                        node: node.to_string(),
                        timestamp,
                        observed_m: observed,
                        severity: if stat > cfg.critical_decision {
                            Severity::Critical
                        } else {
                            Severity::Warning
                        },
                        score: stat,
                    });
                }
            }
        }
        out
    }
}
