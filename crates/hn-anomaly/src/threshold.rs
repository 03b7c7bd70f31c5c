//! Critical pressure limits.

use crate::sample::{AnomalyEvent, Policy, PressureFlag, PressureSample, Severity};

/// Stateless policy: below `critical_low_m` is `Low`, above
/// `critical_high_m` is `High`, both critical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub critical_low_m: f64,
    pub critical_high_m: f64,
}

impl ThresholdPolicy {
    pub fn new(critical_low_m: f64, critical_high_m: f64) -> Self {
        Self {
            critical_low_m,
            critical_high_m,
        }
    }

    pub fn check(&self, sample: &PressureSample) -> Option<AnomalyEvent> {
        let p = sample.pressure_m;
        let (flag, score) = if p < self.critical_low_m {
            (PressureFlag::Low, self.critical_low_m - p)
        } else if p > self.critical_high_m {
            (PressureFlag::High, p - self.critical_high_m)
        } else {
            return None;
        };
        Some(AnomalyEvent {
            node: sample.node.clone(),
            timestamp: sample.timestamp,
            observed_m: p,
            flag,
            severity: Severity::Critical,
            policy: Policy::Threshold,
            score,
        })
    }
}
