//! Alert records handed to external sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector::DetectionReport;
use crate::sample::Severity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub observed_m: f64,
}

/// Alerts for every event at or above `min_severity`, in report order.
pub fn alerts_from(report: &DetectionReport, min_severity: Severity) -> Vec<AlertEvent> {
    report
        .events
        .iter()
        .filter(|e| e.severity >= min_severity)
        .map(|e| AlertEvent {
            node: e.node.clone(),
            timestamp: e.timestamp,
            severity: e.severity,
            observed_m: e.observed_m,
        })
        .collect()
}
