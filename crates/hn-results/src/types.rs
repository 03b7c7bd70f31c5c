//! Result data types.

use chrono::{DateTime, Utc};
use hn_anomaly::AnomalyEvent;
use hn_schedule::Schedule;
use hn_solver::{LinkStatus, NewtonConfig};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub type RunId = String;

/// Outcome of a run as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Results are usable but something fell short (non-converged solve,
    /// infeasible schedule).
    Degraded { reason: String },
    Cancelled,
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node: String,
    pub head_m: f64,
    pub pressure_m: f64,
    pub demand_m3h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub link: String,
    pub flow_m3h: f64,
    pub headloss_m: f64,
    pub status: LinkStatus,
}

/// Hydraulic state for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub period: usize,
    pub timestamp: DateTime<Utc>,
    pub converged: bool,
    pub iterations: usize,
    pub max_residual_m3h: f64,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

impl Snapshot {
    pub fn pressure_m(&self, node: &str) -> Option<f64> {
        self.nodes.iter().find(|n| n.node == node).map(|n| n.pressure_m)
    }

    pub fn flow_m3h(&self, link: &str) -> Option<f64> {
        self.links.iter().find(|l| l.link == link).map(|l| l.flow_m3h)
    }
}

/// A complete run. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub schema_version: u32,
    pub run_id: RunId,
    pub scenario_id: String,
    pub topology_version: String,
    pub created_at: DateTime<Utc>,
    pub solver_params: NewtonConfig,
    pub status: RunStatus,
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub anomalies: Vec<AnomalyEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl SimulationRun {
    pub fn manifest(&self) -> RunManifest {
        RunManifest {
            schema_version: self.schema_version,
            run_id: self.run_id.clone(),
            scenario_id: self.scenario_id.clone(),
            topology_version: self.topology_version.clone(),
            created_at: self.created_at,
            solver_params: self.solver_params,
            status: self.status.clone(),
            snapshot_count: self.snapshots.len(),
            anomalies: self.anomalies.clone(),
            schedule: self.schedule.clone(),
        }
    }

    pub fn from_parts(manifest: RunManifest, snapshots: Vec<Snapshot>) -> Self {
        Self {
            schema_version: manifest.schema_version,
            run_id: manifest.run_id,
            scenario_id: manifest.scenario_id,
            topology_version: manifest.topology_version,
            created_at: manifest.created_at,
            solver_params: manifest.solver_params,
            status: manifest.status,
            snapshots,
            anomalies: manifest.anomalies,
            schedule: manifest.schedule,
        }
    }
}

/// Everything in a run except its snapshots; stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: RunId,
    pub scenario_id: String,
    pub topology_version: String,
    pub created_at: DateTime<Utc>,
    pub solver_params: NewtonConfig,
    pub status: RunStatus,
    pub snapshot_count: usize,
    #[serde(default)]
    pub anomalies: Vec<AnomalyEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_string(&RunStatus::Degraded {
            reason: "solver did not converge".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"degraded","reason":"solver did not converge"}"#);
    }

    #[test]
    fn snapshot_fields_carry_units() {
        let snap = Snapshot {
            period: 0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            converged: true,
            iterations: 3,
            max_residual_m3h: 0.0,
            nodes: vec![NodeSnapshot {
                node: "J1".into(),
                head_m: 50.0,
                pressure_m: 40.0,
                demand_m3h: 10.0,
            }],
            links: vec![],
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["nodes"][0]["pressure_m"], 40.0);
        assert_eq!(snap.pressure_m("J1"), Some(40.0));
    }
}
