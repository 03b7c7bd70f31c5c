//! hn-network: network model layer for hydronet.
//!
//! Provides:
//! - Node and link data structures (junctions, tanks, reservoirs, pump
//!   stations; pipes, pumps, valves)
//! - Incremental network builder with validation
//! - Read-only traversal: adjacency, shortest paths, breadth-first source order
//! - Stable indexing of free-head nodes for solver integration
//!
//! # Example
//!
//! ```
//! use hn_network::NetworkBuilder;
//! use hn_core::units::{m, mm};
//!
//! let mut builder = NetworkBuilder::new();
//! builder.add_reservoir("R1", 50.0);
//! builder.add_junction("J1", 10.0, 36.0);
//! builder.add_pipe("P1", "R1", "J1", m(500.0), mm(200.0), 120.0, 0.0);
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.nodes().len(), 2);
//! assert_eq!(network.links().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod model;
pub mod traverse;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use error::{DisconnectedNetworkError, NetworkError, NetworkResult, TopologyError};
pub use indexing::HeadIndex;
pub use model::{Link, LinkKind, NetworkModel, Node, NodeKind, Pattern, TankSpec};
pub use traverse::{PathMetric, PathResult, SourceOrder};
