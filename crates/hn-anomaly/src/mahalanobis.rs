//! Multivariate Mahalanobis-distance scorer.

use nalgebra::{DMatrix, DVector};

use crate::config::MahalanobisConfig;
use crate::sample::Severity;
use crate::scorer::{Outlier, OutlierScorer, PressureWindow};

/// Scores each network-wide pressure vector against the mean and covariance
/// of the trailing `window` vectors. An outlying timestamp is attributed to
/// the node with the largest standardized deviation.
///
/// Only timestamps observed at every node take part.
#[derive(Debug, Clone)]
pub struct MahalanobisWindow {
    pub config: MahalanobisConfig,
}

impl MahalanobisWindow {
    pub fn new(config: MahalanobisConfig) -> Self {
        Self { config }
    }

    /// Distance of `x` from the rows of `history`, plus the mean and
    /// regularized covariance diagonal. `None` if the covariance cannot be
    /// factorized.
    fn distance(&self, history: &[Vec<f64>], x: &[f64]) -> Option<(f64, DVector<f64>, DVector<f64>)> {
        let n = x.len();
        let m = history.len() as f64;
        let mut mean = DVector::zeros(n);
        for row in history {
            mean += DVector::from_column_slice(row);
        }
        mean /= m;

        let mut cov = DMatrix::zeros(n, n);
        for row in history {
            let d = DVector::from_column_slice(row) - &mean;
            cov += &d * d.transpose();
        }
        cov /= m;
        for i in 0..n {
            cov[(i, i)] += self.config.regularization;
        }
        let diag = cov.diagonal();

        let dev = DVector::from_column_slice(x) - &mean;
        let chol = cov.cholesky()?;
        let solved = chol.solve(&dev);
        let d2 = dev.dot(&solved).max(0.0);
        Some((d2.sqrt(), mean, diag))
    }
}

impl OutlierScorer for MahalanobisWindow {
    fn name(&self) -> &'static str {
        "mahalanobis_window"
    }

    fn score(&self, window: &PressureWindow) -> Vec<Outlier> {
        let cfg = &self.config;
        let nodes: Vec<&str> = window.nodes().collect();
        let rows = window.aligned();
        let mut out = Vec::new();
        if rows.len() <= cfg.window {
            return out;
        }

        let mut history: Vec<Vec<f64>> = rows[..cfg.window].iter().map(|(_, r)| r.clone()).collect();
        for (timestamp, x) in &rows[cfg.window..] {
            let Some((distance, mean, diag)) = self.distance(&history, x) else {
                tracing::warn!(%timestamp, "covariance not positive definite; skipping");
                continue;
            };
            if distance >= cfg.warning_distance {
                let culprit = (0..x.len())
                    .map(|j| (j, ((x[j] - mean[j]) / diag[j].sqrt()).abs()))
                    .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
                if let Some((j, _)) = culprit {
                    out.push(Outlier {
                        node: nodes[j].to_string(),
                        timestamp: *timestamp,
                        observed_m: x[j],
                        severity: if distance >= cfg.critical_distance {
                            Severity::Critical
                        } else {
                            Severity::Warning
                        },
                        score: distance,
                    });
                }
            } else {
                history.remove(0);
                history.push(x.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::PressureSample;
    use chrono::{Duration, TimeZone, Utc};

    /// Three nodes whose pressures move together with a daily swing.
    fn samples(n: usize, break_at: Option<usize>) -> Vec<PressureSample> {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut out = Vec::new();
        for i in 0..n {
            let t = t0 + Duration::hours(i as i64);
            let swing = 2.0 * ((i % 24) as f64 / 24.0 * std::f64::consts::TAU).sin();
            let jitter = 0.05 * ((i * 7 % 5) as f64 - 2.0);
            let mut c = 38.0 + swing * 0.9 - jitter;
            if break_at == Some(i) {
                // C decouples from its neighbours: a burst downstream of it.
                c -= 3.0;
            }
            out.push(PressureSample::new("A", t, 45.0 + swing + jitter));
            out.push(PressureSample::new("B", t, 42.0 + swing * 0.95));
            out.push(PressureSample::new("C", t, c));
        }
        out
    }

    fn scorer() -> MahalanobisWindow {
        MahalanobisWindow::new(MahalanobisConfig {
            window: 48,
            ..MahalanobisConfig::default()
        })
    }

    #[test]
    fn correlated_series_is_clean() {
        let w = PressureWindow::from_samples(&samples(96, None));
        assert!(scorer().score(&w).is_empty());
    }

    #[test]
    fn decoupled_node_is_blamed() {
        let w = PressureWindow::from_samples(&samples(96, Some(70)));
        let hits = scorer().score(&w);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, "C");
        assert_eq!(hits[0].severity, Severity::Critical);
    }
}
