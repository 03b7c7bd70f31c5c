//! Pipe element with Hazen-Williams friction.

use crate::common::{
    HAZEN_WILLIAMS_DIAMETER_EXP, HAZEN_WILLIAMS_SI, check_non_negative, check_positive, floored,
    minor_loss_coefficient,
};
use crate::error::ComponentResult;
use crate::traits::{ElementSettings, FlowEval, HeadLossElement};
use hn_core::units::{Length, meters};

/// Pipe with friction using the Hazen-Williams correlation.
///
/// ```text
/// h = r·|Q|^(n-1)·Q + m·|Q|·Q
/// r = 10.67·L / (C^n · D^4.87)
/// ```
///
/// The exponent `n` is a per-solve setting so it can be fixed by
/// configuration rather than baked into the element.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    /// Pipe length (m)
    pub length_m: f64,
    /// Inner diameter (m)
    pub diameter_m: f64,
    /// Hazen-Williams roughness coefficient C (dimensionless)
    pub roughness: f64,
    /// Minor loss coefficient K (sum over fittings)
    pub minor_loss: f64,
}

impl Pipe {
    /// Create a new pipe.
    ///
    /// # Errors
    /// Length, diameter and roughness must be finite and positive; the minor
    /// loss coefficient must be finite and non-negative.
    pub fn new(
        length: Length,
        diameter: Length,
        roughness: f64,
        minor_loss: f64,
    ) -> ComponentResult<Self> {
        Ok(Self {
            length_m: check_positive(meters(length), "pipe length")?,
            diameter_m: check_positive(meters(diameter), "pipe diameter")?,
            roughness: check_positive(roughness, "pipe roughness")?,
            minor_loss: check_non_negative(minor_loss, "pipe minor loss")?,
        })
    }

    /// Friction resistance for the given exponent.
    pub fn resistance(&self, exponent: f64) -> f64 {
        HAZEN_WILLIAMS_SI * self.length_m
            / (self.roughness.powf(exponent) * self.diameter_m.powf(HAZEN_WILLIAMS_DIAMETER_EXP))
    }
}

impl HeadLossElement for Pipe {
    fn kind(&self) -> &'static str {
        "pipe"
    }

    fn evaluate(&self, q: f64, settings: &ElementSettings) -> FlowEval {
        let n = settings.exponent;
        let r = self.resistance(n);
        let q_abs = q.abs();

        let mut gradient = n * r * q_abs.powf(n - 1.0);
        let mut headloss = r * q_abs.powf(n);

        if self.minor_loss > 0.0 {
            let ml = minor_loss_coefficient(self.minor_loss, self.diameter_m);
            headloss += ml * q_abs * q_abs;
            gradient += 2.0 * ml * q_abs;
        }

        floored(headloss.copysign(q), gradient, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_core::units::{m, mm};

    fn pipe() -> Pipe {
        Pipe::new(m(1000.0), mm(300.0), 100.0, 0.0).unwrap()
    }

    #[test]
    fn rejects_non_physical_parameters() {
        assert!(Pipe::new(m(0.0), mm(300.0), 100.0, 0.0).is_err());
        assert!(Pipe::new(m(100.0), mm(-300.0), 100.0, 0.0).is_err());
        assert!(Pipe::new(m(100.0), mm(300.0), 0.0, 0.0).is_err());
        assert!(Pipe::new(m(100.0), mm(300.0), 120.0, -1.0).is_err());
    }

    #[test]
    fn zero_flow_zero_loss() {
        let eval = pipe().evaluate(0.0, &ElementSettings::default());
        assert_eq!(eval.headloss, 0.0);
        assert!(eval.gradient > 0.0);
    }

    #[test]
    fn headloss_is_odd_in_flow() {
        let p = pipe();
        let s = ElementSettings::default();
        let fwd = p.evaluate(0.08, &s);
        let rev = p.evaluate(-0.08, &s);
        assert!((fwd.headloss + rev.headloss).abs() < 1e-12);
        assert!((fwd.gradient - rev.gradient).abs() < 1e-12);
    }

    #[test]
    fn reference_headloss() {
        // 1 km of 300 mm C=100 pipe at 80 L/s loses roughly 5.2 m.
        let eval = pipe().evaluate(0.08, &ElementSettings::default());
        assert!(eval.headloss > 4.5 && eval.headloss < 6.0, "{}", eval.headloss);
    }

    #[test]
    fn rougher_pipe_loses_more() {
        let smooth = Pipe::new(m(500.0), mm(200.0), 140.0, 0.0).unwrap();
        let rough = Pipe::new(m(500.0), mm(200.0), 80.0, 0.0).unwrap();
        let s = ElementSettings::default();
        assert!(rough.evaluate(0.03, &s).headloss > smooth.evaluate(0.03, &s).headloss);
    }

    #[test]
    fn minor_losses_add_head() {
        let plain = Pipe::new(m(100.0), mm(150.0), 120.0, 0.0).unwrap();
        let fitted = Pipe::new(m(100.0), mm(150.0), 120.0, 5.0).unwrap();
        let s = ElementSettings::default();
        assert!(fitted.evaluate(0.02, &s).headloss > plain.evaluate(0.02, &s).headloss);
    }
}
