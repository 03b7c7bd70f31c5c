//! EPANET `.inp` reader for the subset hydronet models.
//!
//! Supported sections: `[TITLE]`, `[JUNCTIONS]`, `[RESERVOIRS]`, `[TANKS]`,
//! `[PIPES]`, `[PUMPS]`, `[VALVES]`, `[CURVES]`, `[PATTERNS]`, `[STATUS]`,
//! `[COORDINATES]` and `[OPTIONS]`. Other sections are skipped; reading
//! stops at `[END]`. Only SI flow units with Hazen-Williams head loss are
//! accepted. The first inconsistency is reported with its line number and
//! field name.

use std::collections::{BTreeMap, HashMap, HashSet};

use hn_components::ValveStatus;
use hn_solver::PumpState;
use serde::{Deserialize, Serialize};

use crate::schema::{ControlsDef, CurveDef, LinkDef, LinkKind, NodeDef, NodeKind, PatternDef, TopologyDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("line {line} [{section}] {field}: {message}")]
pub struct InpError {
    pub line: usize,
    pub section: &'static str,
    pub field: &'static str,
    pub message: String,
}

/// Flow units accepted in `[OPTIONS] Units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlowUnits {
    #[default]
    Lps,
    Lpm,
    Mld,
    Cmh,
    Cmd,
    Cms,
}

impl FlowUnits {
    /// Multiplier to m³/h.
    pub fn to_m3h(self) -> f64 {
        match self {
            FlowUnits::Lps => 3.6,
            FlowUnits::Lpm => 0.06,
            FlowUnits::Mld => 1000.0 / 24.0,
            FlowUnits::Cmh => 1.0,
            FlowUnits::Cmd => 1.0 / 24.0,
            FlowUnits::Cms => 3600.0,
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().as_str() {
            "LPS" => Ok(FlowUnits::Lps),
            "LPM" => Ok(FlowUnits::Lpm),
            "MLD" => Ok(FlowUnits::Mld),
            "CMH" => Ok(FlowUnits::Cmh),
            "CMD" => Ok(FlowUnits::Cmd),
            "CMS" => Ok(FlowUnits::Cms),
            "CFS" | "GPM" | "MGD" | "IMGD" | "AFD" => Err(format!("US customary units '{s}' are not supported")),
            _ => Err(format!("unknown flow units '{s}'")),
        }
    }
}

/// A parsed `.inp` file: the topology plus pump states from `[STATUS]` and
/// `SPEED` keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct InpNetwork {
    pub topology: TopologyDef,
    pub controls: ControlsDef,
    pub units: FlowUnits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Junctions,
    Reservoirs,
    Tanks,
    Pipes,
    Pumps,
    Valves,
    Curves,
    Patterns,
    Status,
    Coordinates,
    Options,
    Skipped,
    End,
}

impl Section {
    fn from_header(header: &str) -> Self {
        match header.to_ascii_uppercase().as_str() {
            "[TITLE]" => Section::Title,
            "[JUNCTIONS]" => Section::Junctions,
            "[RESERVOIRS]" => Section::Reservoirs,
            "[TANKS]" => Section::Tanks,
            "[PIPES]" => Section::Pipes,
            "[PUMPS]" => Section::Pumps,
            "[VALVES]" => Section::Valves,
            "[CURVES]" => Section::Curves,
            "[PATTERNS]" => Section::Patterns,
            "[STATUS]" => Section::Status,
            "[COORDINATES]" => Section::Coordinates,
            "[OPTIONS]" => Section::Options,
            "[END]" => Section::End,
            _ => Section::Skipped,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Section::Title => "TITLE",
            Section::Junctions => "JUNCTIONS",
            Section::Reservoirs => "RESERVOIRS",
            Section::Tanks => "TANKS",
            Section::Pipes => "PIPES",
            Section::Pumps => "PUMPS",
            Section::Valves => "VALVES",
            Section::Curves => "CURVES",
            Section::Patterns => "PATTERNS",
            Section::Status => "STATUS",
            Section::Coordinates => "COORDINATES",
            Section::Options => "OPTIONS",
            Section::Skipped => "-",
            Section::End => "END",
        }
    }
}

/// Position of a record, for error reporting.
#[derive(Debug, Clone, Copy)]
struct At {
    line: usize,
    section: Section,
}

impl At {
    fn err(self, field: &'static str, message: impl Into<String>) -> InpError {
        InpError {
            line: self.line,
            section: self.section.name(),
            field,
            message: message.into(),
        }
    }

    fn text<'a>(self, fields: &[&'a str], idx: usize, name: &'static str) -> Result<&'a str, InpError> {
        fields.get(idx).copied().ok_or_else(|| self.err(name, "missing value"))
    }

    fn number(self, fields: &[&str], idx: usize, name: &'static str) -> Result<f64, InpError> {
        let raw = self.text(fields, idx, name)?;
        parse_number(raw).ok_or_else(|| self.err(name, format!("'{raw}' is not a number")))
    }

    fn optional_number(self, fields: &[&str], idx: usize, name: &'static str) -> Result<Option<f64>, InpError> {
        match fields.get(idx) {
            None => Ok(None),
            Some(raw) => parse_number(raw)
                .map(Some)
                .ok_or_else(|| self.err(name, format!("'{raw}' is not a number"))),
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

enum PendingKind {
    Pipe(LinkKind),
    Valve(LinkKind),
    Pump { curve: String },
}

struct PendingLink {
    at: At,
    id: String,
    from: String,
    to: String,
    kind: PendingKind,
}

enum StatusValue {
    Open,
    Closed,
    Speed(f64),
}

#[derive(Default)]
struct Reader {
    title: Vec<String>,
    nodes: Vec<(At, NodeDef)>,
    links: Vec<PendingLink>,
    curves: BTreeMap<String, Vec<(f64, f64)>>,
    curve_lines: HashMap<String, At>,
    patterns: Vec<PatternDef>,
    status: Vec<(At, String, StatusValue)>,
    speeds: Vec<(String, f64)>,
    coordinates: Vec<(At, String, f64, f64)>,
    units: FlowUnits,
}

/// Parse `.inp` text.
pub fn parse_inp(text: &str) -> Result<InpNetwork, InpError> {
    let mut reader = Reader::default();
    let mut section = Section::Skipped;

    for (i, raw) in text.lines().enumerate() {
        let content = raw.split(';').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        if content.starts_with('[') {
            section = Section::from_header(content);
            if section == Section::End {
                break;
            }
            continue;
        }
        let at = At { line: i + 1, section };
        let fields: Vec<&str> = content.split_whitespace().collect();
        reader.record(at, content, &fields)?;
    }
    reader.finish()
}

impl Reader {
    fn record(&mut self, at: At, content: &str, f: &[&str]) -> Result<(), InpError> {
        match at.section {
            Section::Title => self.title.push(content.to_string()),
            Section::Junctions => {
                let node = NodeDef {
                    id: at.text(f, 0, "id")?.to_string(),
                    elevation_m: at.number(f, 1, "elevation")?,
                    kind: NodeKind::Junction {
                        // in file flow units until `finish`
                        demand_m3h: at.optional_number(f, 2, "demand")?.unwrap_or(0.0),
                        pattern: f.get(3).map(|p| p.to_string()),
                    },
                    coordinates: None,
                };
                self.nodes.push((at, node));
            }
            Section::Reservoirs => {
                let node = NodeDef {
                    id: at.text(f, 0, "id")?.to_string(),
                    elevation_m: at.number(f, 1, "head")?,
                    kind: NodeKind::Reservoir {
                        head_pattern: f.get(2).map(|p| p.to_string()),
                    },
                    coordinates: None,
                };
                self.nodes.push((at, node));
            }
            Section::Tanks => {
                if f.get(7).is_some_and(|c| *c != "*") {
                    return Err(at.err("volume curve", "volume curves are not supported"));
                }
                let node = NodeDef {
                    id: at.text(f, 0, "id")?.to_string(),
                    elevation_m: at.number(f, 1, "elevation")?,
                    kind: NodeKind::Tank {
                        initial_level_m: at.number(f, 2, "initial level")?,
                        min_level_m: at.number(f, 3, "minimum level")?,
                        max_level_m: at.number(f, 4, "maximum level")?,
                        diameter_m: at.number(f, 5, "diameter")?,
                    },
                    coordinates: None,
                };
                self.nodes.push((at, node));
            }
            Section::Pipes => {
                if let Some(status) = f.get(7).filter(|s| !s.eq_ignore_ascii_case("open")) {
                    return Err(at.err("status", format!("pipe status '{status}' is not supported")));
                }
                let kind = LinkKind::Pipe {
                    length_m: at.number(f, 3, "length")?,
                    diameter_mm: at.number(f, 4, "diameter")?,
                    roughness: at.number(f, 5, "roughness")?,
                    minor_loss: at.optional_number(f, 6, "minor loss")?.unwrap_or(0.0),
                };
                self.push_link(at, f, PendingKind::Pipe(kind))?;
            }
            Section::Pumps => {
                let mut curve = None;
                let mut rest = f.iter().skip(3);
                while let Some(keyword) = rest.next() {
                    let value = rest.next().ok_or_else(|| at.err("parameters", format!("'{keyword}' has no value")))?;
                    match keyword.to_ascii_uppercase().as_str() {
                        "HEAD" => curve = Some(value.to_string()),
                        "SPEED" => {
                            let speed = parse_number(value)
                                .filter(|s| *s >= 0.0)
                                .ok_or_else(|| at.err("speed", format!("'{value}' is not a valid speed")))?;
                            self.speeds.push((at.text(f, 0, "id")?.to_string(), speed));
                        }
                        "POWER" => return Err(at.err("parameters", "constant-power pumps are not supported")),
                        "PATTERN" => return Err(at.err("parameters", "pump speed patterns are not supported")),
                        other => return Err(at.err("parameters", format!("unknown keyword '{other}'"))),
                    }
                }
                let curve = curve.ok_or_else(|| at.err("parameters", "pump has no HEAD curve"))?;
                self.push_link(at, f, PendingKind::Pump { curve })?;
            }
            Section::Valves => {
                let valve_type = at.text(f, 4, "type")?;
                let setting = at.number(f, 5, "setting")?;
                let minor = at.optional_number(f, 6, "minor loss")?.unwrap_or(0.0);
                // A throttle control valve's setting is its loss coefficient.
                let minor_loss = match valve_type.to_ascii_uppercase().as_str() {
                    "TCV" => setting,
                    "PRV" | "PSV" | "PBV" | "FCV" | "GPV" => {
                        return Err(at.err("type", format!("{valve_type} valves are not supported")));
                    }
                    _ => return Err(at.err("type", format!("unknown valve type '{valve_type}'"))),
                };
                let kind = LinkKind::Valve {
                    diameter_mm: at.number(f, 3, "diameter")?,
                    minor_loss: minor_loss + minor,
                    status: ValveStatus::Open,
                };
                self.push_link(at, f, PendingKind::Valve(kind))?;
            }
            Section::Curves => {
                let id = at.text(f, 0, "id")?.to_string();
                let x = at.number(f, 1, "x")?;
                let y = at.number(f, 2, "y")?;
                let points = self.curves.entry(id.clone()).or_default();
                if points.last().is_some_and(|(px, _)| x <= *px) {
                    return Err(at.err("x", format!("curve '{id}' flows must increase")));
                }
                points.push((x, y));
                self.curve_lines.entry(id).or_insert(at);
            }
            Section::Patterns => {
                let id = at.text(f, 0, "id")?;
                let mut values = Vec::with_capacity(f.len().saturating_sub(1));
                for raw in &f[1..] {
                    values.push(parse_number(raw).ok_or_else(|| at.err("multiplier", format!("'{raw}' is not a number")))?);
                }
                match self.patterns.iter_mut().find(|p| p.id == id) {
                    Some(p) => p.multipliers.extend(values),
                    None => self.patterns.push(PatternDef {
                        id: id.to_string(),
                        multipliers: values,
                    }),
                }
            }
            Section::Status => {
                let id = at.text(f, 0, "id")?.to_string();
                let raw = at.text(f, 1, "status")?;
                let value = match raw.to_ascii_uppercase().as_str() {
                    "OPEN" => StatusValue::Open,
                    "CLOSED" => StatusValue::Closed,
                    _ => StatusValue::Speed(
                        parse_number(raw)
                            .filter(|s| *s >= 0.0)
                            .ok_or_else(|| at.err("status", format!("'{raw}' is not OPEN, CLOSED or a speed")))?,
                    ),
                };
                self.status.push((at, id, value));
            }
            Section::Coordinates => {
                let id = at.text(f, 0, "id")?.to_string();
                let x = at.number(f, 1, "x")?;
                let y = at.number(f, 2, "y")?;
                self.coordinates.push((at, id, x, y));
            }
            Section::Options => self.option(at, f)?,
            Section::Skipped | Section::End => {}
        }
        Ok(())
    }

    fn push_link(&mut self, at: At, f: &[&str], kind: PendingKind) -> Result<(), InpError> {
        self.links.push(PendingLink {
            at,
            id: at.text(f, 0, "id")?.to_string(),
            from: at.text(f, 1, "node1")?.to_string(),
            to: at.text(f, 2, "node2")?.to_string(),
            kind,
        });
        Ok(())
    }

    fn option(&mut self, at: At, f: &[&str]) -> Result<(), InpError> {
        let Some(key) = f.first() else { return Ok(()) };
        match key.to_ascii_uppercase().as_str() {
            "UNITS" => {
                let value = at.text(f, 1, "units")?;
                self.units = FlowUnits::parse(value).map_err(|m| at.err("units", m))?;
            }
            "HEADLOSS" => {
                let value = at.text(f, 1, "headloss")?;
                if !value.eq_ignore_ascii_case("H-W") {
                    return Err(at.err("headloss", format!("head loss formula '{value}' is not supported")));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<InpNetwork, InpError> {
        let factor = self.units.to_m3h();
        let patterns: HashSet<&str> = self.patterns.iter().map(|p| p.id.as_str()).collect();

        let mut node_ids: HashSet<String> = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut node_at: HashMap<String, usize> = HashMap::new();
        for (at, mut node) in self.nodes {
            if !node_ids.insert(node.id.clone()) {
                return Err(at.err("id", format!("duplicate node id '{}'", node.id)));
            }
            let pattern = match &mut node.kind {
                NodeKind::Junction { demand_m3h, pattern } => {
                    *demand_m3h *= factor;
                    pattern.as_deref()
                }
                NodeKind::Reservoir { head_pattern } => head_pattern.as_deref(),
                _ => None,
            };
            if let Some(p) = pattern.filter(|p| !patterns.contains(p)) {
                return Err(at.err("pattern", format!("unknown pattern '{p}'")));
            }
            node_at.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }

        let mut link_ids = HashSet::new();
        let mut links = Vec::with_capacity(self.links.len());
        let mut link_index: HashMap<String, usize> = HashMap::new();
        for pending in self.links {
            let at = pending.at;
            if !link_ids.insert(pending.id.clone()) {
                return Err(at.err("id", format!("duplicate link id '{}'", pending.id)));
            }
            if !node_ids.contains(&pending.from) {
                return Err(at.err("node1", format!("unknown node '{}'", pending.from)));
            }
            if !node_ids.contains(&pending.to) {
                return Err(at.err("node2", format!("unknown node '{}'", pending.to)));
            }
            let kind = match pending.kind {
                PendingKind::Pipe(kind) | PendingKind::Valve(kind) => kind,
                PendingKind::Pump { curve } => {
                    let points = self
                        .curves
                        .get(&curve)
                        .ok_or_else(|| at.err("curve", format!("unknown curve '{curve}'")))?;
                    let curve_at = self.curve_lines.get(&curve).copied().unwrap_or(at);
                    LinkKind::Pump {
                        curve: head_curve(curve_at, &curve, points, factor)?,
                    }
                }
            };
            link_index.insert(pending.id.clone(), links.len());
            links.push(LinkDef {
                id: pending.id,
                from: pending.from,
                to: pending.to,
                kind,
            });
        }

        let mut controls = ControlsDef::default();
        for (id, speed) in self.speeds {
            controls.pumps.insert(id, PumpState::On { speed });
        }
        for (at, id, value) in self.status {
            let idx = *link_index.get(&id).ok_or_else(|| at.err("id", format!("unknown link '{id}'")))?;
            match (&mut links[idx].kind, value) {
                (LinkKind::Valve { status, .. }, StatusValue::Open) => *status = ValveStatus::Open,
                (LinkKind::Valve { status, .. }, StatusValue::Closed) => *status = ValveStatus::Closed,
                (LinkKind::Pump { .. }, StatusValue::Open) => {
                    controls.pumps.insert(id, PumpState::On { speed: 1.0 });
                }
                (LinkKind::Pump { .. }, StatusValue::Closed) => {
                    controls.pumps.insert(id, PumpState::Off);
                }
                (LinkKind::Pump { .. }, StatusValue::Speed(speed)) => {
                    controls.pumps.insert(id, PumpState::On { speed });
                }
                _ => return Err(at.err("status", format!("status cannot be applied to link '{id}'"))),
            }
        }

        for (at, id, x, y) in self.coordinates {
            let idx = *node_at.get(&id).ok_or_else(|| at.err("id", format!("unknown node '{id}'")))?;
            nodes[idx].coordinates = Some([x, y]);
        }

        let title = if self.title.is_empty() {
            None
        } else {
            Some(self.title.join("\n"))
        };
        Ok(InpNetwork {
            topology: TopologyDef {
                title,
                nodes,
                links,
                patterns: self.patterns,
            },
            controls,
            units: self.units,
        })
    }
}

/// One design point, or shutoff plus two points starting at zero flow.
fn head_curve(at: At, id: &str, points: &[(f64, f64)], factor: f64) -> Result<CurveDef, InpError> {
    match points {
        [(q, h)] => Ok(CurveDef::SinglePoint {
            flow_m3h: q * factor,
            head_m: *h,
        }),
        [(q0, h0), (q1, h1), (q2, h2)] if *q0 == 0.0 => Ok(CurveDef::ThreePoint {
            shutoff_head_m: *h0,
            design: [q1 * factor, *h1],
            max: [q2 * factor, *h2],
        }),
        _ => Err(at.err(
            "curve",
            format!("curve '{id}' must have one point, or three points starting at zero flow"),
        )),
    }
}
