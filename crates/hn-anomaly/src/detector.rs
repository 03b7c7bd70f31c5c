//! Policy combination and detection reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::cusum::CusumDrift;
use crate::error::{AnomalyError, AnomalyResult};
use crate::mahalanobis::MahalanobisWindow;
use crate::sample::{AnomalyEvent, Policy, PressureFlag, PressureSample};
use crate::scorer::{OutlierScorer, PressureWindow};
use crate::threshold::ThresholdPolicy;
use crate::zscore::RollingZScore;

/// Result of scoring a history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Worst flag per node (every node in the history appears).
    pub flags: BTreeMap<String, PressureFlag>,
    /// One event per flagged (node, timestamp), ordered by time then node.
    pub events: Vec<AnomalyEvent>,
}

impl DetectionReport {
    pub fn flag(&self, node: &str) -> PressureFlag {
        self.flags.get(node).copied().unwrap_or_default()
    }

    pub fn is_clean(&self) -> bool {
        self.events.is_empty()
    }

    /// Copy of `samples` with each flag set from the events.
    pub fn annotate(&self, samples: &[PressureSample]) -> Vec<PressureSample> {
        let index: BTreeMap<(&str, DateTime<Utc>), PressureFlag> = self
            .events
            .iter()
            .map(|e| ((e.node.as_str(), e.timestamp), e.flag))
            .collect();
        samples
            .iter()
            .map(|s| PressureSample {
                flag: index
                    .get(&(s.node.as_str(), s.timestamp))
                    .copied()
                    .unwrap_or(PressureFlag::Normal),
                ..s.clone()
            })
            .collect()
    }
}

/// Runs the threshold policy and every configured scorer, OR-combined.
pub struct AnomalyDetector {
    threshold: ThresholdPolicy,
    scorers: Vec<Box<dyn OutlierScorer>>,
}

impl std::fmt::Debug for AnomalyDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyDetector")
            .field("threshold", &self.threshold)
            .field("scorers", &self.scorers.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl AnomalyDetector {
    pub fn new(config: &DetectorConfig) -> AnomalyResult<Self> {
        config.validate()?;
        let mut detector = Self {
            threshold: ThresholdPolicy::new(config.critical_low_m, config.critical_high_m),
            scorers: Vec::new(),
        };
        if let Some(z) = &config.zscore {
            detector = detector.with_scorer(Box::new(RollingZScore::new(z.clone())));
        }
        if let Some(c) = &config.cusum {
            detector = detector.with_scorer(Box::new(CusumDrift::new(c.clone())));
        }
        if let Some(m) = &config.mahalanobis {
            detector = detector.with_scorer(Box::new(MahalanobisWindow::new(m.clone())));
        }
        Ok(detector)
    }

    /// Add another statistical backend.
    pub fn with_scorer(mut self, scorer: Box<dyn OutlierScorer>) -> Self {
        self.scorers.push(scorer);
        self
    }

    pub fn scorer_names(&self) -> Vec<&'static str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    /// Score a history. Per node, samples must be strictly increasing in
    /// time; nodes may interleave.
    pub fn score(&self, history: &[PressureSample]) -> AnomalyResult<DetectionReport> {
        let mut last: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
        let mut flags: BTreeMap<String, PressureFlag> = BTreeMap::new();
        for s in history {
            if !s.pressure_m.is_finite() {
                return Err(AnomalyError::NonFinite {
                    node: s.node.clone(),
                    timestamp: s.timestamp,
                });
            }
            if let Some(prev) = last.insert(s.node.as_str(), s.timestamp) {
                if s.timestamp <= prev {
                    return Err(AnomalyError::OutOfOrder {
                        node: s.node.clone(),
                        last: prev,
                        got: s.timestamp,
                    });
                }
            }
            flags.entry(s.node.clone()).or_default();
        }

        let mut merged: BTreeMap<(DateTime<Utc>, String), AnomalyEvent> = BTreeMap::new();
        let mut offer = |event: AnomalyEvent| {
            let key = (event.timestamp, event.node.clone());
            match merged.get(&key) {
                Some(existing) if !event.outranks(existing) => {}
                _ => {
                    merged.insert(key, event);
                }
            }
        };

        for s in history {
            if let Some(event) = self.threshold.check(s) {
                offer(event);
            }
        }

        let window = PressureWindow::from_samples(history);
        for scorer in &self.scorers {
            for o in scorer.score(&window) {
                offer(AnomalyEvent {
                    node: o.node,
                    timestamp: o.timestamp,
                    observed_m: o.observed_m,
                    flag: PressureFlag::Anomalous,
                    severity: o.severity,
                    policy: Policy::Statistical {
                        backend: scorer.name().to_string(),
                    },
                    score: o.score,
                });
            }
        }

        let events: Vec<AnomalyEvent> = merged.into_values().collect();
        let mut worst: BTreeMap<&str, &AnomalyEvent> = BTreeMap::new();
        for e in &events {
            match worst.get(e.node.as_str()) {
                Some(w) if !e.outranks(w) => {}
                _ => {
                    worst.insert(e.node.as_str(), e);
                }
            }
        }
        for (node, e) in worst {
            flags.insert(node.to_string(), e.flag);
        }

        if !events.is_empty() {
            tracing::debug!(events = events.len(), "anomaly events detected");
        }
        Ok(DetectionReport { flags, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZScoreConfig;
    use crate::sample::Severity;
    use chrono::{Duration, TimeZone};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() + Duration::minutes(10 * i)
    }

    #[test]
    fn out_of_order_rejected() {
        let d = AnomalyDetector::new(&DetectorConfig::default()).unwrap();
        let history = vec![
            PressureSample::new("J", t(1), 30.0),
            PressureSample::new("J", t(0), 30.0),
        ];
        assert!(matches!(d.score(&history), Err(AnomalyError::OutOfOrder { .. })));
    }

    #[test]
    fn threshold_beats_statistical_on_same_sample() {
        let cfg = DetectorConfig {
            critical_low_m: 25.0,
            critical_high_m: 90.0,
            zscore: Some(ZScoreConfig {
                window: 4,
                min_consecutive: 1,
                ..ZScoreConfig::default()
            }),
            cusum: None,
            mahalanobis: None,
        };
        let d = AnomalyDetector::new(&cfg).unwrap();
        let mut history: Vec<PressureSample> = (0..8)
            .map(|i| PressureSample::new("J", t(i), 40.0 + 0.1 * (i % 2) as f64))
            .collect();
        history.push(PressureSample::new("J", t(8), 5.0));
        let report = d.score(&history).unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].policy, Policy::Threshold);
        assert_eq!(report.events[0].severity, Severity::Critical);
        assert_eq!(report.flag("J"), PressureFlag::Low);
    }

    #[test]
    fn annotate_marks_flagged_samples() {
        let d = AnomalyDetector::new(&DetectorConfig::threshold_only(20.0, 60.0)).unwrap();
        let history = vec![
            PressureSample::new("A", t(0), 30.0),
            PressureSample::new("A", t(1), 70.0),
        ];
        let report = d.score(&history).unwrap();
        let annotated = report.annotate(&history);
        assert_eq!(annotated[0].flag, PressureFlag::Normal);
        assert_eq!(annotated[1].flag, PressureFlag::High);
    }
}
