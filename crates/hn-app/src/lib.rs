//! Shared application service layer for hydronet.
//!
//! This crate is the single entry point for front ends: it loads projects,
//! runs the solve → detect → optimize → aggregate pipeline for a scenario,
//! reuses stored runs by content hash, fans independent scenarios out over
//! rayon and hands alerts to external sinks.

pub mod alerts;
pub mod batch;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod simulate;

pub use alerts::{AlertSink, CollectingSink, TracingSink, alerts_for_run, dispatch_alerts};
pub use batch::{BatchOutcome, run_batch};
pub use error::{AppError, AppResult};
pub use progress::{PeriodProgress, RunProgressEvent, RunStage};
pub use project_service::{
    ScenarioSummary, compile_network, get_scenario, list_scenarios, load_project, save_project,
};
pub use query::{RunSummary, get_run_summary, node_series};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress, execute_scenario,
    list_runs, load_run,
};
pub use simulate::{PeriodClock, SimulationOutput, simulate};
