//! Project schema definitions.

use std::collections::BTreeMap;

use hn_anomaly::DetectorConfig;
use hn_components::ValveStatus;
use hn_schedule::{OptimizerConfig, PressureBound, PumpSpec};
use hn_solver::{NewtonConfig, PumpState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    pub network: TopologyDef,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDef>,
}

impl Project {
    pub fn scenario(&self, id: &str) -> Option<&ScenarioDef> {
        self.scenarios.iter().find(|s| s.id == id)
    }
}

/// Network topology as written in a project file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologyDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub id: String,
    /// Ground elevation; for reservoirs, the total head (m).
    pub elevation_m: f64,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NodeKind {
    Junction {
        #[serde(default)]
        demand_m3h: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Reservoir {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head_pattern: Option<String>,
    },
    Tank {
        initial_level_m: f64,
        min_level_m: f64,
        max_level_m: f64,
        diameter_m: f64,
    },
    PumpStation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkDef {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum LinkKind {
    Pipe {
        length_m: f64,
        diameter_mm: f64,
        /// Hazen-Williams C
        roughness: f64,
        #[serde(default)]
        minor_loss: f64,
    },
    Pump {
        curve: CurveDef,
    },
    Valve {
        diameter_mm: f64,
        #[serde(default)]
        minor_loss: f64,
        #[serde(default)]
        status: ValveStatus,
    },
}

/// Pump head curve; flows in m³/h, heads in m.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CurveDef {
    SinglePoint {
        flow_m3h: f64,
        head_m: f64,
    },
    ThreePoint {
        shutoff_head_m: f64,
        design: [f64; 2],
        max: [f64; 2],
    },
    /// `H = shutoff - coefficient·Q^exponent` with Q in m³/s.
    Power {
        shutoff_head_m: f64,
        coefficient: f64,
        exponent: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternDef {
    pub id: String,
    pub multipliers: Vec<f64>,
}

/// One configured run over the project network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub solver: NewtonConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub controls: ControlsDef,
    /// Extended-period simulation; absent means a single steady solve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleDef>,
}

impl ScenarioDef {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            solver: NewtonConfig::default(),
            detector: DetectorConfig::default(),
            optimizer: OptimizerConfig::default(),
            controls: ControlsDef::default(),
            simulation: None,
            schedule: None,
        }
    }
}

/// Per-solve overrides keyed by link name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControlsDef {
    #[serde(default)]
    pub pumps: BTreeMap<String, PumpState>,
    #[serde(default)]
    pub valves: BTreeMap<String, ValveStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    pub periods: usize,
    #[serde(default = "default_period_hours")]
    pub period_hours: f64,
    /// Timestamp of period 0 (RFC 3339); defaults to the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

fn default_period_hours() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub forecast_m3h: Vec<f64>,
    pub pumps: Vec<PumpSpec>,
    #[serde(default)]
    pub bounds: Vec<PressureBound>,
}
