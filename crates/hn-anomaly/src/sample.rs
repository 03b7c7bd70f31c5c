//! Sample and event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a pressure sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PressureFlag {
    #[default]
    Normal,
    Low,
    High,
    Anomalous,
}

/// Event severity. Ordered: `Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

/// One pressure observation at a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub pressure_m: f64,
    #[serde(default)]
    pub flag: PressureFlag,
}

impl PressureSample {
    pub fn new(node: impl Into<String>, timestamp: DateTime<Utc>, pressure_m: f64) -> Self {
        Self {
            node: node.into(),
            timestamp,
            pressure_m,
            flag: PressureFlag::Normal,
        }
    }
}

/// Which policy raised an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Policy {
    Threshold,
    Statistical { backend: String },
}

/// A flagged sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub observed_m: f64,
    pub flag: PressureFlag,
    pub severity: Severity,
    pub policy: Policy,
    /// Policy-specific magnitude (m beyond the limit, |z|, CUSUM statistic, distance).
    pub score: f64,
}

impl AnomalyEvent {
    /// Ordering used when two events hit the same node and timestamp:
    /// severity, then threshold over statistical, then score.
    pub fn outranks(&self, other: &AnomalyEvent) -> bool {
        if self.severity != other.severity {
            return self.severity > other.severity;
        }
        let self_thr = self.policy == Policy::Threshold;
        let other_thr = other.policy == Policy::Threshold;
        if self_thr != other_thr {
            return self_thr;
        }
        self.score > other.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(severity: Severity, policy: Policy, score: f64) -> AnomalyEvent {
        AnomalyEvent {
            node: "J1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            observed_m: 10.0,
            flag: PressureFlag::Anomalous,
            severity,
            policy,
            score,
        }
    }

    #[test]
    fn severity_wins_first() {
        let crit = event(Severity::Critical, Policy::Statistical { backend: "z".into() }, 1.0);
        let warn = event(Severity::Warning, Policy::Threshold, 9.0);
        assert!(crit.outranks(&warn));
        assert!(!warn.outranks(&crit));
    }

    #[test]
    fn threshold_breaks_severity_tie() {
        let thr = event(Severity::Critical, Policy::Threshold, 1.0);
        let stat = event(Severity::Critical, Policy::Statistical { backend: "z".into() }, 9.0);
        assert!(thr.outranks(&stat));
    }

    #[test]
    fn score_breaks_remaining_tie() {
        let a = event(Severity::Warning, Policy::Statistical { backend: "z".into() }, 4.0);
        let b = event(Severity::Warning, Policy::Statistical { backend: "cusum".into() }, 6.0);
        assert!(b.outranks(&a));
    }

    #[test]
    fn sample_json_uses_unit_names() {
        let s = PressureSample::new("J1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 31.5);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"pressure_m\":31.5"));
        assert!(json.contains("\"flag\":\"normal\""));
    }
}
