//! Project definitions to runtime models.

use hn_components::PumpCurve;
use hn_core::units::{m, mm};
use hn_network::{NetworkBuilder, NetworkModel, TankSpec};
use hn_solver::Controls;

use crate::schema::{ControlsDef, CurveDef, LinkKind, NodeKind, TopologyDef};
use crate::validate::ValidationError;
use crate::{ProjectError, ProjectResult};

/// Build and validate the network described by a topology.
pub fn compile_topology(topology: &TopologyDef) -> ProjectResult<NetworkModel> {
    let mut b = NetworkBuilder::new();
    if let Some(title) = &topology.title {
        b.set_title(title.clone());
    }
    for pattern in &topology.patterns {
        b.add_pattern(pattern.id.clone(), pattern.multipliers.clone());
    }

    for node in &topology.nodes {
        let id = match &node.kind {
            NodeKind::Junction { demand_m3h, pattern } => {
                let id = b.add_junction(node.id.clone(), node.elevation_m, *demand_m3h);
                if let Some(p) = pattern {
                    b.set_pattern(id, p.clone());
                }
                id
            }
            NodeKind::Reservoir { head_pattern } => {
                let id = b.add_reservoir(node.id.clone(), node.elevation_m);
                if let Some(p) = head_pattern {
                    b.set_pattern(id, p.clone());
                }
                id
            }
            NodeKind::Tank {
                initial_level_m,
                min_level_m,
                max_level_m,
                diameter_m,
            } => b.add_tank(
                node.id.clone(),
                node.elevation_m,
                TankSpec {
                    initial_level_m: *initial_level_m,
                    min_level_m: *min_level_m,
                    max_level_m: *max_level_m,
                    diameter_m: *diameter_m,
                },
            ),
            NodeKind::PumpStation => b.add_pump_station(node.id.clone(), node.elevation_m),
        };
        if let Some([x, y]) = node.coordinates {
            b.set_coordinates(id, x, y);
        }
    }

    for link in &topology.links {
        let (name, from, to) = (link.id.clone(), link.from.clone(), link.to.clone());
        match &link.kind {
            LinkKind::Pipe {
                length_m,
                diameter_mm,
                roughness,
                minor_loss,
            } => {
                b.add_pipe(name, from, to, m(*length_m), mm(*diameter_mm), *roughness, *minor_loss);
            }
            LinkKind::Pump { curve } => {
                b.add_pump(name, from, to, curve_from_def(curve));
            }
            LinkKind::Valve {
                diameter_mm,
                minor_loss,
                status,
            } => {
                b.add_valve(name, from, to, mm(*diameter_mm), *minor_loss, *status);
            }
        }
    }

    Ok(b.build()?)
}

fn curve_from_def(curve: &CurveDef) -> hn_components::ComponentResult<PumpCurve> {
    match curve {
        CurveDef::SinglePoint { flow_m3h, head_m } => PumpCurve::single_point(*flow_m3h, *head_m),
        CurveDef::ThreePoint {
            shutoff_head_m,
            design,
            max,
        } => PumpCurve::three_point(*shutoff_head_m, (design[0], design[1]), (max[0], max[1])),
        CurveDef::Power {
            shutoff_head_m,
            coefficient,
            exponent,
        } => PumpCurve::power(*shutoff_head_m, *coefficient, *exponent),
    }
}

/// Resolve name-keyed controls against a built network.
pub fn resolve_controls(network: &NetworkModel, controls: &ControlsDef) -> ProjectResult<Controls> {
    let mut out = Controls::new();
    for (name, state) in &controls.pumps {
        let link = network
            .link_by_name(name)
            .filter(|l| l.is_pump())
            .ok_or_else(|| missing(name, "pump control"))?;
        out = out.with_pump(link.id, *state);
    }
    for (name, status) in &controls.valves {
        let link = network
            .link_by_name(name)
            .filter(|l| l.is_valve())
            .ok_or_else(|| missing(name, "valve control"))?;
        out = out.with_valve(link.id, *status);
    }
    Ok(out)
}

fn missing(id: &str, context: &str) -> ProjectError {
    ValidationError::MissingReference {
        id: id.to_string(),
        context: context.to_string(),
    }
    .into()
}
