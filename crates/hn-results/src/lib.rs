//! hn-results: run records, content-hash run ids and the run store.
//!
//! Provides:
//! - `SimulationRun` records with unit-carrying field names
//! - SHA-256 run ids over topology, demand input and parameters
//! - Append-only `RunStore` (JSON manifest + JSONL snapshots)
//! - `GraphProjection` export for graph-database mirroring

pub mod graph;
pub mod hash;
pub mod store;
pub mod types;

pub use graph::{GraphEdge, GraphNode, GraphProjection};
pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Run already stored: {run_id}")]
    RunExists { run_id: String },

    #[error("Unsupported schema version {found} for run {run_id}")]
    SchemaVersion { run_id: String, found: u32 },
}
