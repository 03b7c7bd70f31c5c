//! hn-components: physical link elements for water networks.
//!
//! Provides head-loss laws for the three link kinds:
//! - Pipes with Hazen-Williams friction plus minor losses
//! - Pumps with a power-law head curve and affinity-law speed scaling
//! - Valves with a minor-loss coefficient and open/closed status
//!
//! All elements implement the `HeadLossElement` trait and are deterministic
//! functions of flow and settings, suitable for network solving. Parameters
//! are validated at construction so the solver never sees a non-physical
//! element.
//!
//! # Example
//!
//! ```
//! use hn_components::{HeadLossElement, ElementSettings, Pipe};
//! use hn_core::units::{m, mm};
//!
//! let pipe = Pipe::new(m(1000.0), mm(300.0), 100.0, 0.0).unwrap();
//! let eval = pipe.evaluate(0.05, &ElementSettings::default());
//! assert!(eval.headloss > 0.0);
//! ```

pub mod common;
pub mod error;
pub mod pipe;
pub mod pump;
pub mod traits;
pub mod valve;

// Re-exports
pub use error::{ComponentError, ComponentResult};
pub use pipe::Pipe;
pub use pump::{Pump, PumpCurve};
pub use traits::{ElementSettings, FlowEval, HeadLossElement};
pub use valve::{Valve, ValveStatus};
