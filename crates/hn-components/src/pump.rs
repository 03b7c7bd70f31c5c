//! Pump element with a power-law head curve.

use crate::common::{BIG_GRADIENT, MIN_GRADIENT, check_positive};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::{ElementSettings, FlowEval, HeadLossElement};
use hn_core::units::SECONDS_PER_HOUR;

/// Head-flow curve `H(Q) = h0 - r·Q^n` with Q in m³/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpCurve {
    /// Shutoff head at zero flow (m)
    pub shutoff_head: f64,
    /// Curve coefficient (m per (m³/s)^n)
    pub r: f64,
    /// Curve exponent
    pub n: f64,
}

impl PumpCurve {
    /// Curve from explicit coefficients.
    pub fn power(shutoff_head: f64, r: f64, n: f64) -> ComponentResult<Self> {
        let shutoff_head = check_positive(shutoff_head, "pump shutoff head")?;
        let r = check_positive(r, "pump curve coefficient")?;
        let n = check_positive(n, "pump curve exponent")?;
        if n > 20.0 {
            return Err(ComponentError::InvalidCurve {
                what: "exponent out of range",
            });
        }
        Ok(Self { shutoff_head, r, n })
    }

    /// Curve through a single design point (flow m³/h, head m).
    ///
    /// Shutoff head is taken as 4/3 of the design head with a quadratic
    /// falloff, which is the conventional single-point fit.
    pub fn single_point(flow_m3h: f64, head_m: f64) -> ComponentResult<Self> {
        let q = check_positive(flow_m3h, "pump design flow")? / SECONDS_PER_HOUR;
        let h = check_positive(head_m, "pump design head")?;
        let h0 = 4.0 / 3.0 * h;
        Self::power(h0, (h0 - h) / (q * q), 2.0)
    }

    /// Curve through shutoff head and two further points (flow m³/h, head m).
    pub fn three_point(
        shutoff_head: f64,
        p1: (f64, f64),
        p2: (f64, f64),
    ) -> ComponentResult<Self> {
        let h0 = check_positive(shutoff_head, "pump shutoff head")?;
        let q1 = check_positive(p1.0, "pump curve flow")? / SECONDS_PER_HOUR;
        let q2 = check_positive(p2.0, "pump curve flow")? / SECONDS_PER_HOUR;
        let (h1, h2) = (p1.1, p2.1);
        if !(h1.is_finite() && h2.is_finite()) || h2 < 0.0 {
            return Err(ComponentError::InvalidCurve {
                what: "heads must be finite and non-negative",
            });
        }
        if q2 <= q1 || !(h0 > h1 && h1 > h2) {
            return Err(ComponentError::InvalidCurve {
                what: "head must strictly decrease with flow",
            });
        }
        let n = ((h0 - h2) / (h0 - h1)).ln() / (q2 / q1).ln();
        if !n.is_finite() || n <= 0.0 {
            return Err(ComponentError::InvalidCurve {
                what: "curve points do not fit a power law",
            });
        }
        let r = (h0 - h1) / q1.powf(n);
        Self::power(h0, r, n)
    }

    /// Head delivered at flow `q` (m³/s) and relative speed `speed`.
    pub fn head(&self, q: f64, speed: f64) -> f64 {
        let s2 = speed * speed;
        s2 * self.shutoff_head - self.r * speed.powf(2.0 - self.n) * q.max(0.0).powf(self.n)
    }

    /// Flow at which the curve reaches zero head (m³/s) at nominal speed.
    pub fn max_flow(&self) -> f64 {
        (self.shutoff_head / self.r).powf(1.0 / self.n)
    }
}

/// Centrifugal pump described by its head curve.
///
/// Reverse flow is blocked by a steep linear branch so that a pump never
/// runs backwards inside a converged solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Pump {
    pub curve: PumpCurve,
}

impl Pump {
    pub fn new(curve: PumpCurve) -> Self {
        Self { curve }
    }
}

impl HeadLossElement for Pump {
    fn kind(&self) -> &'static str {
        "pump"
    }

    fn evaluate(&self, q: f64, settings: &ElementSettings) -> FlowEval {
        let s = settings.speed;
        let h0 = s * s * self.curve.shutoff_head;

        if q < 0.0 {
            return FlowEval {
                headloss: -h0 + BIG_GRADIENT * q,
                gradient: BIG_GRADIENT,
            };
        }

        let n = self.curve.n;
        let rs = self.curve.r * s.powf(2.0 - n);
        let gradient = (n * rs * q.powf(n - 1.0)).max(MIN_GRADIENT);
        FlowEval {
            headloss: -h0 + rs * q.powf(n),
            gradient,
        }
    }

    fn allows_reverse_flow(&self) -> bool {
        false
    }
}
