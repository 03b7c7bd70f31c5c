//! hn-core: stable foundation for hydronet.
//!
//! Contains:
//! - units (uom SI types + constructors, flow unit conversions)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for network objects)
//! - cancel (cooperative cancellation shared by long-running solves)
//! - error (shared error types)

pub mod cancel;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use cancel::CancelToken;
pub use error::{HnError, HnResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
