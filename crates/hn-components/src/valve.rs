//! Valve element with a minor-loss characteristic and open/closed status.

use crate::common::{check_non_negative, check_positive, floored, minor_loss_coefficient};
use crate::error::ComponentResult;
use crate::traits::{ElementSettings, FlowEval, HeadLossElement};
use hn_core::units::{Length, meters};
use serde::{Deserialize, Serialize};

/// Open/closed status of an isolation valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValveStatus {
    #[default]
    Open,
    Closed,
}

/// Isolation valve.
///
/// When open it behaves like a short fitting with loss `h = m·Q|Q|`. A closed
/// valve is removed from the active system by the solver for that solve, so
/// `evaluate` only describes the open state.
#[derive(Debug, Clone, PartialEq)]
pub struct Valve {
    /// Valve diameter (m)
    pub diameter_m: f64,
    /// Minor loss coefficient K when fully open
    pub minor_loss: f64,
    /// Status applied when no per-solve override is given
    pub initial_status: ValveStatus,
}

impl Valve {
    pub fn new(diameter: Length, minor_loss: f64, initial_status: ValveStatus) -> ComponentResult<Self> {
        Ok(Self {
            diameter_m: check_positive(meters(diameter), "valve diameter")?,
            minor_loss: check_non_negative(minor_loss, "valve minor loss")?,
            initial_status,
        })
    }
}

impl HeadLossElement for Valve {
    fn kind(&self) -> &'static str {
        "valve"
    }

    fn evaluate(&self, q: f64, _settings: &ElementSettings) -> FlowEval {
        let m = minor_loss_coefficient(self.minor_loss, self.diameter_m);
        let q_abs = q.abs();
        floored(m * q_abs * q, 2.0 * m * q_abs, q)
    }
}
