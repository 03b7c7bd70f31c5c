//! Project validation logic.
//!
//! Checks cross references the network builder cannot see (scenario
//! controls, schedule pumps, monitored nodes) plus id uniqueness. Physical
//! parameter checks happen when the topology is compiled.

use std::collections::{HashMap, HashSet};

use crate::schema::{LinkKind, NodeKind, Project, ScenarioDef, TopologyDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    validate_topology(&project.network)?;

    let mut scenario_ids = HashSet::new();
    for scenario in &project.scenarios {
        if !scenario_ids.insert(&scenario.id) {
            return Err(ValidationError::DuplicateId {
                id: scenario.id.clone(),
                context: "scenarios".to_string(),
            });
        }
        validate_scenario(scenario, &project.network)?;
    }
    Ok(())
}

pub fn validate_topology(topology: &TopologyDef) -> Result<(), ValidationError> {
    let mut pattern_ids = HashSet::new();
    for pattern in &topology.patterns {
        if !pattern_ids.insert(pattern.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: pattern.id.clone(),
                context: "patterns".to_string(),
            });
        }
    }

    let mut node_ids = HashSet::new();
    for node in &topology.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: node.id.clone(),
                context: "nodes".to_string(),
            });
        }
        let pattern = match &node.kind {
            NodeKind::Junction { demand_m3h, pattern } => {
                if !(demand_m3h.is_finite() && *demand_m3h >= 0.0) {
                    return Err(ValidationError::InvalidValue {
                        field: format!("node '{}' demand_m3h", node.id),
                        value: demand_m3h.to_string(),
                        reason: "must be finite and >= 0".to_string(),
                    });
                }
                pattern.as_deref()
            }
            NodeKind::Reservoir { head_pattern } => head_pattern.as_deref(),
            NodeKind::Tank { .. } | NodeKind::PumpStation => None,
        };
        if let Some(p) = pattern.filter(|p| !pattern_ids.contains(p)) {
            return Err(ValidationError::MissingReference {
                id: p.to_string(),
                context: format!("node '{}' pattern", node.id),
            });
        }
    }

    let mut link_ids = HashSet::new();
    for link in &topology.links {
        if !link_ids.insert(link.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: link.id.clone(),
                context: "links".to_string(),
            });
        }
        for end in [&link.from, &link.to] {
            if !node_ids.contains(end.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: end.clone(),
                    context: format!("link '{}' endpoint", link.id),
                });
            }
        }
    }
    Ok(())
}

fn validate_scenario(scenario: &ScenarioDef, topology: &TopologyDef) -> Result<(), ValidationError> {
    let links: HashMap<&str, &LinkKind> = topology.links.iter().map(|l| (l.id.as_str(), &l.kind)).collect();
    let nodes: HashSet<&str> = topology.nodes.iter().map(|n| n.id.as_str()).collect();
    let context = |what: &str| format!("scenario '{}' {what}", scenario.id);

    for pump in scenario.controls.pumps.keys() {
        if !matches!(links.get(pump.as_str()), Some(LinkKind::Pump { .. })) {
            return Err(ValidationError::MissingReference {
                id: pump.clone(),
                context: context("pump control"),
            });
        }
    }
    for valve in scenario.controls.valves.keys() {
        if !matches!(links.get(valve.as_str()), Some(LinkKind::Valve { .. })) {
            return Err(ValidationError::MissingReference {
                id: valve.clone(),
                context: context("valve control"),
            });
        }
    }

    if let Some(sim) = &scenario.simulation {
        if sim.periods == 0 {
            return Err(ValidationError::InvalidValue {
                field: context("simulation.periods"),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(sim.period_hours.is_finite() && sim.period_hours > 0.0) {
            return Err(ValidationError::InvalidValue {
                field: context("simulation.period_hours"),
                value: sim.period_hours.to_string(),
                reason: "must be finite and > 0".to_string(),
            });
        }
    }

    if let Some(schedule) = &scenario.schedule {
        let horizon = schedule.forecast_m3h.len();
        for pump in &schedule.pumps {
            if !matches!(links.get(pump.id.as_str()), Some(LinkKind::Pump { .. })) {
                return Err(ValidationError::MissingReference {
                    id: pump.id.clone(),
                    context: context("schedule pump"),
                });
            }
            if pump.unit_cost.len() < horizon {
                return Err(ValidationError::InvalidValue {
                    field: context(&format!("schedule pump '{}' unit_cost", pump.id)),
                    value: pump.unit_cost.len().to_string(),
                    reason: format!("needs one cost per period ({horizon})"),
                });
            }
        }
        for bound in &schedule.bounds {
            if !nodes.contains(bound.node.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: bound.node.clone(),
                    context: context("pressure bound"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LinkDef, NodeDef, PatternDef};

    fn topology() -> TopologyDef {
        TopologyDef {
            title: None,
            nodes: vec![
                NodeDef {
                    id: "R".into(),
                    elevation_m: 50.0,
                    kind: NodeKind::Reservoir { head_pattern: None },
                    coordinates: None,
                },
                NodeDef {
                    id: "J".into(),
                    elevation_m: 10.0,
                    kind: NodeKind::Junction {
                        demand_m3h: 20.0,
                        pattern: Some("day".into()),
                    },
                    coordinates: None,
                },
            ],
            links: vec![LinkDef {
                id: "P".into(),
                from: "R".into(),
                to: "J".into(),
                kind: LinkKind::Pipe {
                    length_m: 100.0,
                    diameter_mm: 150.0,
                    roughness: 120.0,
                    minor_loss: 0.0,
                },
            }],
            patterns: vec![PatternDef {
                id: "day".into(),
                multipliers: vec![1.0, 1.2],
            }],
        }
    }

    #[test]
    fn valid_topology_passes() {
        validate_topology(&topology()).unwrap();
    }

    #[test]
    fn missing_pattern_is_reported() {
        let mut t = topology();
        t.patterns.clear();
        assert!(matches!(
            validate_topology(&t),
            Err(ValidationError::MissingReference { id, .. }) if id == "day"
        ));
    }

    #[test]
    fn dangling_link_is_reported() {
        let mut t = topology();
        t.links[0].to = "X".into();
        assert!(matches!(
            validate_topology(&t),
            Err(ValidationError::MissingReference { id, .. }) if id == "X"
        ));
    }

    #[test]
    fn pipe_cannot_be_scheduled() {
        let mut scenario = ScenarioDef::new("s");
        scenario.schedule = Some(crate::schema::ScheduleDef {
            forecast_m3h: vec![10.0],
            pumps: vec![hn_schedule::PumpSpec::new("P", 10.0, 0.8, vec![1.0])],
            bounds: vec![],
        });
        assert!(matches!(
            validate_scenario(&scenario, &topology()),
            Err(ValidationError::MissingReference { .. })
        ));
    }
}
