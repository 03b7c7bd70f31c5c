//! Core traits for link elements.

use std::fmt::Debug;

/// Head loss and its derivative at a given flow.
///
/// Sign convention: `headloss = H_from - H_to` for a flow `q` from the `from`
/// node to the `to` node. Pumps report a negative head loss (a head gain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEval {
    /// Head loss (m)
    pub headloss: f64,
    /// d(headloss)/dq (m per m³/s), always positive
    pub gradient: f64,
}

/// Per-solve settings that modulate an element's law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSettings {
    /// Friction exponent for pipes (Hazen-Williams default 1.852)
    pub exponent: f64,
    /// Relative pump speed (1.0 = nominal curve)
    pub speed: f64,
}

impl Default for ElementSettings {
    fn default() -> Self {
        Self {
            exponent: 1.852,
            speed: 1.0,
        }
    }
}

/// Trait for elements whose head loss is a monotonic function of flow.
///
/// Elements are deterministic functions of flow and settings, suitable for
/// Newton iteration. Flows are in m³/s.
pub trait HeadLossElement: Send + Sync + Debug {
    /// Short name of the element kind for diagnostics.
    fn kind(&self) -> &'static str;

    /// Evaluate head loss and gradient at flow `q` (m³/s).
    fn evaluate(&self, q: f64, settings: &ElementSettings) -> FlowEval;

    /// Whether the element may carry flow from `to` to `from`.
    ///
    /// Default: reversible.
    fn allows_reverse_flow(&self) -> bool {
        true
    }
}
