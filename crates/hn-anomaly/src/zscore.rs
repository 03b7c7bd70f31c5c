//! Rolling z-score scorer.

use std::collections::VecDeque;

use crate::config::ZScoreConfig;
use crate::sample::Severity;
use crate::scorer::{Outlier, OutlierScorer, PressureWindow, mean_std};

/// Flags samples whose z-score against the trailing `window` in-range
/// samples of the same node exceeds the warning level for at least
/// `min_consecutive` samples in a row. Once a run qualifies, every sample in
/// it is reported. Exceeding samples never enter the baseline.
#[derive(Debug, Clone)]
pub struct RollingZScore {
    pub config: ZScoreConfig,
}

impl RollingZScore {
    pub fn new(config: ZScoreConfig) -> Self {
        Self { config }
    }

    fn severity(&self, z: f64) -> Severity {
        if z >= self.config.critical_sigma {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }
}

impl OutlierScorer for RollingZScore {
    fn name(&self) -> &'static str {
        "rolling_zscore"
    }

    fn score(&self, window: &PressureWindow) -> Vec<Outlier> {
        let cfg = &self.config;
        let mut out = Vec::new();

        for (node, series) in window.series() {
            let mut baseline: VecDeque<f64> = VecDeque::with_capacity(cfg.window);
            let mut run: Vec<Outlier> = Vec::new();
            for &(timestamp, observed) in series {
                if baseline.len() < cfg.window {
                    baseline.push_back(observed);
                    continue;
                }
                let (mean, std) = mean_std(baseline.iter().copied());
                let z = ((observed - mean) / std.max(cfg.min_std_m)).abs();

                if z >= cfg.warning_sigma {
                    run.push(Outlier {
                        node: node.to_string(),
                        timestamp,
                        observed_m: observed,
                        severity: self.severity(z),
                        score: z,
                    });
                    continue;
                }
                if run.len() >= cfg.min_consecutive {
                    out.append(&mut run);
                }
                run.clear();
                baseline.pop_front();
                baseline.push_back(observed);
            }
            if run.len() >= cfg.min_consecutive {
                out.append(&mut run);
            }
        }
        out
    }
}
