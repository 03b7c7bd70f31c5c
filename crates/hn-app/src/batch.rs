//! Parallel execution of independent scenarios.

use hn_core::CancelToken;
use hn_project::{Project, ScenarioDef};
use hn_results::SimulationRun;
use rayon::prelude::*;

use crate::error::AppResult;
use crate::project_service::{compile_network, get_scenario};
use crate::run_service::execute_scenario;

#[derive(Debug)]
pub struct BatchOutcome {
    pub scenario_id: String,
    pub result: AppResult<SimulationRun>,
}

/// Execute scenarios in parallel over one shared network.
///
/// An empty id list runs every scenario. Outcomes come back in request
/// order; one failing scenario does not stop the others.
pub fn run_batch(
    project: &Project,
    scenario_ids: &[String],
    cancel: Option<&CancelToken>,
) -> AppResult<Vec<BatchOutcome>> {
    let network = compile_network(project)?;
    let scenarios: Vec<&ScenarioDef> = if scenario_ids.is_empty() {
        project.scenarios.iter().collect()
    } else {
        scenario_ids
            .iter()
            .map(|id| get_scenario(project, id))
            .collect::<AppResult<_>>()?
    };
    tracing::info!(scenarios = scenarios.len(), "starting batch");

    Ok(scenarios
        .par_iter()
        .map(|scenario| BatchOutcome {
            scenario_id: scenario.id.clone(),
            result: execute_scenario(&network, scenario, cancel, None),
        })
        .collect())
}
