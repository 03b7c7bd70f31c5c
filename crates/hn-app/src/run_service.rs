//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use hn_anomaly::{AnomalyDetector, PressureSample};
use hn_core::CancelToken;
use hn_network::NetworkModel;
use hn_project::{ControlsDef, ScenarioDef, ScheduleDef, SimulationDef};
use hn_results::{RunManifest, RunStatus, RunStore, SCHEMA_VERSION, SimulationRun, Snapshot};
use hn_schedule::{OptimizerConfig, Schedule, ScheduleError, ScheduleOptimizer, ScheduleRequest};
use hn_solver::SolverError;
use serde::Serialize;

use crate::error::AppResult;
use crate::progress::{PeriodProgress, RunProgressEvent, RunStage};
use crate::project_service;
use crate::simulate::{PeriodClock, simulate};

/// Options for running a scenario.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Return a stored run with the same id instead of recomputing.
    pub use_cache: bool,
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cancel: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub scenario_id: &'a str,
    pub options: RunOptions,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub run: SimulationRun,
    pub loaded_from_cache: bool,
    /// False for cancelled runs, which are never persisted.
    pub stored: bool,
    pub total_time_s: f64,
}

struct Reporter<'a> {
    scenario_id: String,
    started: Instant,
    cb: Option<&'a mut dyn FnMut(RunProgressEvent)>,
}

impl<'a> Reporter<'a> {
    fn new(scenario_id: &str, cb: Option<&'a mut dyn FnMut(RunProgressEvent)>) -> Self {
        Self {
            scenario_id: scenario_id.to_string(),
            started: Instant::now(),
            cb,
        }
    }

    fn stage(&mut self, stage: RunStage, message: &str) {
        tracing::info!(scenario = %self.scenario_id, ?stage, "{message}");
        if let Some(cb) = self.cb.as_deref_mut() {
            cb(RunProgressEvent::stage(
                self.scenario_id.clone(),
                stage,
                self.started.elapsed().as_secs_f64(),
                Some(message.to_string()),
            ));
        }
    }

    fn period(&mut self, progress: PeriodProgress) {
        if let Some(cb) = self.cb.as_deref_mut() {
            cb(RunProgressEvent {
                scenario_id: self.scenario_id.clone(),
                stage: RunStage::Solving,
                elapsed_wall_s: self.started.elapsed().as_secs_f64(),
                message: None,
                period: Some(progress),
            });
        }
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let mut reporter = Reporter::new(request.scenario_id, progress_cb);

    reporter.stage(RunStage::LoadingProject, "Loading project");
    let project = project_service::load_project(request.project_path)?;
    let scenario = project_service::get_scenario(&project, request.scenario_id)?;

    reporter.stage(RunStage::CompilingNetwork, "Compiling network");
    let network = project_service::compile_network(&project)?;

    reporter.stage(RunStage::CheckingCache, "Checking run cache");
    let run_id = scenario_run_id(&network, scenario)?;
    let store = RunStore::for_project(request.project_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        reporter.stage(RunStage::LoadingCachedResult, "Loading cached run");
        let run = store.load_run(&run_id)?;
        reporter.stage(RunStage::Completed, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            run,
            loaded_from_cache: true,
            stored: true,
            total_time_s: reporter.started.elapsed().as_secs_f64(),
        });
    }

    let run = execute_with(
        &network,
        scenario,
        run_id.clone(),
        request.options.cancel.as_ref(),
        &mut reporter,
    )?;

    let stored = match &run.status {
        RunStatus::Cancelled => false,
        _ if store.has_run(&run_id) => {
            tracing::warn!(run_id = %run_id, "run already stored; keeping the stored copy");
            true
        }
        _ => {
            reporter.stage(RunStage::SavingResults, "Saving results");
            store.save_run(&run)?;
            true
        }
    };

    reporter.stage(RunStage::Completed, "Run completed");
    Ok(RunResponse {
        run_id,
        run,
        loaded_from_cache: false,
        stored,
        total_time_s: reporter.started.elapsed().as_secs_f64(),
    })
}

/// Run id for a scenario on a compiled network.
///
/// Hashes the topology version, the per-period demands, the solver
/// parameters and everything else that shapes the result: controls,
/// simulation clock, detector, optimizer and schedule inputs.
pub fn scenario_run_id(network: &NetworkModel, scenario: &ScenarioDef) -> AppResult<String> {
    #[derive(Serialize)]
    struct RunContext<'a> {
        controls: &'a ControlsDef,
        simulation: Option<&'a SimulationDef>,
        detector: &'a hn_anomaly::DetectorConfig,
        optimizer: &'a OptimizerConfig,
        schedule: Option<&'a ScheduleDef>,
    }

    let clock = PeriodClock::from_def(scenario.simulation.as_ref())?;
    let demands: Vec<Vec<f64>> = (0..clock.periods).map(|p| network.demands_at(p)).collect();
    let context = RunContext {
        controls: &scenario.controls,
        simulation: scenario.simulation.as_ref(),
        detector: &scenario.detector,
        optimizer: &scenario.optimizer,
        schedule: scenario.schedule.as_ref(),
    };
    Ok(hn_results::compute_run_id(
        &network.topology_version(),
        &demands,
        &scenario.solver,
        &context,
    )?)
}

/// Run the full pipeline for one scenario without touching the store.
pub fn execute_scenario(
    network: &NetworkModel,
    scenario: &ScenarioDef,
    cancel: Option<&CancelToken>,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<SimulationRun> {
    let run_id = scenario_run_id(network, scenario)?;
    let mut reporter = Reporter::new(&scenario.id, progress_cb);
    execute_with(network, scenario, run_id, cancel, &mut reporter)
}

fn execute_with(
    network: &NetworkModel,
    scenario: &ScenarioDef,
    run_id: String,
    cancel: Option<&CancelToken>,
    reporter: &mut Reporter<'_>,
) -> AppResult<SimulationRun> {
    let clock = PeriodClock::from_def(scenario.simulation.as_ref())?;
    let controls = hn_project::resolve_controls(network, &scenario.controls)?;
    let mut degraded: Vec<String> = Vec::new();

    reporter.stage(RunStage::Solving, "Solving hydraulics");
    let output = simulate(
        network,
        &controls,
        &scenario.solver,
        &clock,
        cancel,
        &mut |p| reporter.period(p),
    )?;
    let unconverged = output.unconverged_periods();
    if !unconverged.is_empty() {
        let periods: Vec<String> = unconverged.iter().map(|p| p.to_string()).collect();
        degraded.push(format!("period(s) {} did not converge", periods.join(", ")));
    }

    let mut cancelled = output.cancelled;
    let mut anomalies = Vec::new();
    let mut schedule: Option<Schedule> = None;

    if !cancelled {
        reporter.stage(RunStage::Detecting, "Scoring pressure history");
        let samples = pressure_samples(network, &output.snapshots);
        let report = AnomalyDetector::new(&scenario.detector)?.score(&samples)?;
        if !report.is_clean() {
            tracing::warn!(events = report.events.len(), "pressure anomalies detected");
        }
        anomalies = report.events;
    }

    if let (false, Some(def)) = (cancelled, &scenario.schedule) {
        reporter.stage(RunStage::Optimizing, "Optimizing pump schedule");
        let request = ScheduleRequest::new(def.forecast_m3h.clone(), def.pumps.clone())
            .with_bounds(def.bounds.clone());
        let mut optimizer = ScheduleOptimizer::new(scenario.optimizer.clone());
        match optimizer.optimize_network(network, &request, cancel) {
            Ok(plan) => schedule = Some(plan),
            Err(ScheduleError::Infeasible(infeasible)) => {
                tracing::warn!(%infeasible, "no feasible pump schedule");
                degraded.push(infeasible.to_string());
            }
            Err(ScheduleError::Solver(err @ SolverError::NotConverged { .. })) => {
                tracing::warn!(%err, "schedule check did not converge");
                degraded.push(format!("schedule check: {err}"));
            }
            Err(ScheduleError::Cancelled { .. }) => cancelled = true,
            Err(err) => return Err(err.into()),
        }
    }

    let status = if cancelled {
        tracing::warn!(scenario = %scenario.id, "run cancelled");
        RunStatus::Cancelled
    } else if degraded.is_empty() {
        RunStatus::Completed
    } else {
        let reason = degraded.join("; ");
        tracing::warn!(scenario = %scenario.id, %reason, "run degraded");
        RunStatus::Degraded { reason }
    };

    Ok(SimulationRun {
        schema_version: SCHEMA_VERSION,
        run_id,
        scenario_id: scenario.id.clone(),
        topology_version: network.topology_version(),
        created_at: Utc::now(),
        solver_params: scenario.solver,
        status,
        snapshots: output.snapshots,
        anomalies,
        schedule,
    })
}

/// Pressure history of every free-head node; tanks and reservoirs are
/// not monitored.
fn pressure_samples(network: &NetworkModel, snapshots: &[Snapshot]) -> Vec<PressureSample> {
    let monitored: Vec<bool> = network.nodes().iter().map(|n| !n.is_source()).collect();
    snapshots
        .iter()
        .flat_map(|s| {
            s.nodes
                .iter()
                .zip(&monitored)
                .filter(|(_, keep)| **keep)
                .map(move |(n, _)| PressureSample::new(n.node.clone(), s.timestamp, n.pressure_m))
        })
        .collect()
}

/// List stored runs of a project, optionally for one scenario.
pub fn list_runs(project_path: &Path, scenario_id: Option<&str>) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;
    Ok(match scenario_id {
        Some(id) => store.list_for_scenario(id)?,
        None => store.list_runs()?,
    })
}

/// Load a stored run with its snapshots.
pub fn load_run(project_path: &Path, run_id: &str) -> AppResult<SimulationRun> {
    let store = RunStore::for_project(project_path)?;
    Ok(store.load_run(run_id)?)
}
