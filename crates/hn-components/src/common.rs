//! Common constants and helpers for head-loss evaluation.

use crate::error::{ComponentError, ComponentResult};
use crate::traits::FlowEval;

/// Gradient used for blocked flow directions (check valves, pump reverse flow).
pub const BIG_GRADIENT: f64 = 1e8;

/// Lower bound on the head-loss gradient (m per m³/s). Keeps the Newton step
/// defined at zero flow; below it the law is linearized.
pub const MIN_GRADIENT: f64 = 1e-7;

/// Hazen-Williams SI coefficient (flow in m³/s, lengths in m).
pub const HAZEN_WILLIAMS_SI: f64 = 10.67;

/// Hazen-Williams diameter exponent.
pub const HAZEN_WILLIAMS_DIAMETER_EXP: f64 = 4.87;

/// Ensure a parameter is finite and strictly positive.
pub fn check_positive(value: f64, what: &'static str) -> ComponentResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ComponentError::NonPhysical { what, value });
    }
    Ok(value)
}

/// Ensure a parameter is finite and non-negative.
pub fn check_non_negative(value: f64, what: &'static str) -> ComponentResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ComponentError::NonPhysical { what, value });
    }
    Ok(value)
}

/// Minor-loss coefficient in head units: h = m·Q|Q| with Q in m³/s.
///
/// From h = K·v²/2g with v = Q/A and A = πD²/4.
pub fn minor_loss_coefficient(k: f64, diameter_m: f64) -> f64 {
    let g = hn_core::units::constants::G0_MPS2;
    8.0 * k / (g * std::f64::consts::PI.powi(2) * diameter_m.powi(4))
}

/// Apply the gradient floor: below it the law is linear through the origin.
pub fn floored(headloss: f64, gradient: f64, q: f64) -> FlowEval {
    if gradient < MIN_GRADIENT {
        FlowEval {
            headloss: MIN_GRADIENT * q,
            gradient: MIN_GRADIENT,
        }
    } else {
        FlowEval { headloss, gradient }
    }
}
