//! Per-solve link and source controls.

use std::collections::BTreeMap;

use hn_components::ValveStatus;
use hn_core::{LinkId, NodeId};
use serde::{Deserialize, Serialize};

/// Operating state of a pump for one solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpState {
    /// Removed from the active system.
    Off,
    /// Running on its curve scaled by the affinity laws.
    On { speed: f64 },
    /// Delivers a fixed flow (m³/h) regardless of head.
    FlowSetpoint { flow_m3h: f64 },
}

impl Default for PumpState {
    fn default() -> Self {
        PumpState::On { speed: 1.0 }
    }
}

/// Overrides applied for a single solve. Anything not listed keeps its
/// declared state: pumps run at nominal speed, valves keep their initial
/// status, sources keep their declared head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Controls {
    pub pumps: BTreeMap<LinkId, PumpState>,
    pub valves: BTreeMap<LinkId, ValveStatus>,
    /// Total head (m) for reservoirs and tanks.
    pub source_heads: BTreeMap<NodeId, f64>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pump(mut self, link: LinkId, state: PumpState) -> Self {
        self.pumps.insert(link, state);
        self
    }

    pub fn with_valve(mut self, link: LinkId, status: ValveStatus) -> Self {
        self.valves.insert(link, status);
        self
    }

    pub fn with_source_head(mut self, node: NodeId, head_m: f64) -> Self {
        self.source_heads.insert(node, head_m);
        self
    }

    pub fn pump_state(&self, link: LinkId) -> PumpState {
        self.pumps.get(&link).copied().unwrap_or_default()
    }

    pub fn valve_status(&self, link: LinkId, declared: ValveStatus) -> ValveStatus {
        self.valves.get(&link).copied().unwrap_or(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let c = Controls::new();
        let l = LinkId::from_index(3);
        assert_eq!(c.pump_state(l), PumpState::On { speed: 1.0 });
        assert_eq!(c.valve_status(l, ValveStatus::Closed), ValveStatus::Closed);
    }

    #[test]
    fn overrides_win() {
        let l = LinkId::from_index(0);
        let c = Controls::new()
            .with_pump(l, PumpState::Off)
            .with_valve(l, ValveStatus::Open);
        assert_eq!(c.pump_state(l), PumpState::Off);
        assert_eq!(c.valve_status(l, ValveStatus::Closed), ValveStatus::Open);
    }
}
