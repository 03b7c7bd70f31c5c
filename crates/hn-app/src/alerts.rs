//! Alert delivery.
//!
//! Detection produces `AlertEvent` records; where they go is up to the
//! caller's sinks.

use std::sync::Mutex;

use hn_anomaly::{AlertEvent, DetectionReport, Severity, alerts_from};
use hn_results::SimulationRun;

use crate::error::{AppError, AppResult};

pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn deliver(&self, alert: &AlertEvent) -> AppResult<()>;
}

/// Keeps every alert in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    alerts: Mutex<Vec<AlertEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        match self.alerts.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AlertSink for CollectingSink {
    fn name(&self) -> &'static str {
        "collecting"
    }

    fn deliver(&self, alert: &AlertEvent) -> AppResult<()> {
        self.alerts
            .lock()
            .map_err(|_| AppError::Alert("collecting sink lock poisoned".to_string()))?
            .push(alert.clone());
        Ok(())
    }
}

/// Logs alerts: critical ones at error level, warnings at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn deliver(&self, alert: &AlertEvent) -> AppResult<()> {
        match alert.severity {
            Severity::Critical => tracing::error!(
                node = %alert.node,
                timestamp = %alert.timestamp,
                observed_m = alert.observed_m,
                "critical pressure alert"
            ),
            Severity::Warning => tracing::warn!(
                node = %alert.node,
                timestamp = %alert.timestamp,
                observed_m = alert.observed_m,
                "pressure warning"
            ),
        }
        Ok(())
    }
}

/// Alerts at or above `min_severity` for a finished run.
pub fn alerts_for_run(run: &SimulationRun, min_severity: Severity) -> Vec<AlertEvent> {
    let report = DetectionReport {
        events: run.anomalies.clone(),
        ..DetectionReport::default()
    };
    alerts_from(&report, min_severity)
}

/// Hand every alert to every sink; returns the number of deliveries.
pub fn dispatch_alerts(alerts: &[AlertEvent], sinks: &[&dyn AlertSink]) -> AppResult<usize> {
    let mut delivered = 0;
    for sink in sinks {
        for alert in alerts {
            sink.deliver(alert)?;
            delivered += 1;
        }
        tracing::debug!(sink = sink.name(), alerts = alerts.len(), "alerts delivered");
    }
    Ok(delivered)
}
